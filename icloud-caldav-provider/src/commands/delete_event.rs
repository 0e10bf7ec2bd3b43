//! Delete an event by UID.

use anyhow::Result;
use icloud_caldav_core::TimeWindow;
use icloud_caldav_core::protocol::DeleteEvent;
use tracing::debug;

use crate::backend::CalDavBackend;
use crate::commands::find_event;
use crate::resolver::resolve_calendar;

/// `false` when no event in the lookup window has this UID.
pub async fn handle(backend: &dyn CalDavBackend, cmd: DeleteEvent) -> Result<bool> {
    let calendar = resolve_calendar(backend, &cmd.calendar_name_or_url).await?;
    let window = TimeWindow::lookup()?;

    let Some((object, _)) = find_event(backend, &calendar, &window, |uid| uid == cmd.uid).await?
    else {
        return Ok(false);
    };

    backend.delete_object(&calendar, &object).await?;

    debug!(uid = %cmd.uid, href = %object.href, "deleted event");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use chrono::Utc;

    fn delete(uid: &str) -> DeleteEvent {
        DeleteEvent {
            calendar_name_or_url: "Work".into(),
            uid: uid.into(),
        }
    }

    #[tokio::test]
    async fn test_delete_twice_is_true_then_false() {
        let backend = backend();
        let day = Utc::now().format("%Y%m%d");
        let data = vevent("abc", "Gone", &format!("{day}T090000"), &format!("{day}T100000"));
        backend.insert_object(WORK_URL, "abc", &data).unwrap();

        assert!(handle(&backend, delete("abc")).await.unwrap());
        assert!(backend.objects(WORK_URL).is_empty());
        assert!(!handle(&backend, delete("abc")).await.unwrap());
    }

    #[tokio::test]
    async fn test_events_outside_lookup_window_are_invisible() {
        let backend = backend();
        let data = vevent("old", "Ancient", "20000101T090000", "20000101T100000");
        backend.insert_object(WORK_URL, "old", &data).unwrap();

        assert!(!handle(&backend, delete("old")).await.unwrap());
        assert_eq!(backend.objects(WORK_URL).len(), 1);
    }
}
