//! List the principal's calendars.

use anyhow::Result;
use icloud_caldav_core::CalendarRecord;
use icloud_caldav_core::protocol::ListCalendars;

use crate::backend::CalDavBackend;

pub async fn handle(backend: &dyn CalDavBackend, _cmd: ListCalendars) -> Result<Vec<CalendarRecord>> {
    let calendars = backend.list_calendars().await?;
    Ok(calendars.iter().map(|c| c.to_record()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::memory::MemoryBackend;

    #[tokio::test]
    async fn test_lists_in_server_order_with_ids() {
        let calendars = handle(&backend(), ListCalendars {}).await.unwrap();
        assert_eq!(
            calendars,
            vec![
                CalendarRecord {
                    name: Some("Work".into()),
                    url: WORK_URL.into(),
                    id: Some("work".into()),
                },
                CalendarRecord {
                    name: Some("Home".into()),
                    url: HOME_URL.into(),
                    id: Some("home".into()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unnamed_calendar_has_null_name() {
        let backend = MemoryBackend::new().with_calendar(None, "https://cal.example.com/");
        let calendars = handle(&backend, ListCalendars {}).await.unwrap();
        assert_eq!(calendars[0].name, None);
        assert_eq!(calendars[0].id, None);
    }
}
