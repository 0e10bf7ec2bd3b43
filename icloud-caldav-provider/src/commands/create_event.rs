//! Create a new event.
//!
//! The body is PUT as `<calendar>/<uid>.ics` with create-only semantics.

use anyhow::Result;
use chrono::Utc;
use icloud_caldav_core::ics::{EventDraft, build_event_ics, new_uid};
use icloud_caldav_core::protocol::CreateEvent;
use icloud_caldav_core::{ServerConfig, Timestamp};
use tracing::debug;

use crate::backend::CalDavBackend;
use crate::resolver::resolve_calendar;

pub async fn handle(
    config: &ServerConfig,
    backend: &dyn CalDavBackend,
    cmd: CreateEvent,
) -> Result<String> {
    let start = Timestamp::parse(&cmd.start)?;
    let end = Timestamp::parse(&cmd.end)?;
    let tzid = cmd
        .tzid
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| config.default_tzid.clone());

    let calendar = resolve_calendar(backend, &cmd.calendar_name_or_url).await?;

    let draft = EventDraft {
        uid: new_uid(),
        summary: cmd.summary,
        description: cmd.description,
        start: start.wall_clock(),
        end: end.wall_clock(),
        tzid,
        dtstamp: Utc::now(),
    };
    let ics = build_event_ics(&draft);

    backend.create_object(&calendar, &draft.uid, &ics).await?;

    debug!(uid = %draft.uid, calendar = %calendar.url, "created event");
    Ok(draft.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::list_events;
    use crate::commands::test_support::*;
    use icloud_caldav_core::protocol::ListEvents;

    fn create(summary: &str, start: &str, end: &str) -> CreateEvent {
        CreateEvent {
            calendar_name_or_url: "Work".into(),
            summary: summary.into(),
            start: start.into(),
            end: end.into(),
            tzid: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_created_event_is_listed_with_its_summary() {
        let backend = backend();
        let uid = handle(
            &config(),
            &backend,
            create("Standup", "2025-06-01T09:00:00", "2025-06-01T09:15:00"),
        )
        .await
        .unwrap();

        let (hex, suffix) = uid.split_at(32);
        assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_eq!(suffix, "@icloud-caldav-mcp");

        let records = list_events::handle(
            &config(),
            &backend,
            ListEvents {
                calendar_name_or_url: "Work".into(),
                start: "2025-06-01".into(),
                end: "2025-06-02".into(),
                expand_recurring: true,
            },
        )
        .await
        .unwrap();

        let record = records
            .iter()
            .find(|r| r.uid == uid)
            .expect("created event is listed");
        assert_eq!(record.summary, "Standup");
    }

    #[tokio::test]
    async fn test_body_uses_literal_fields_and_default_tzid() {
        let backend = backend();
        let uid = handle(
            &config(),
            &backend,
            create("Call", "2025-06-01T09:00:00Z", "2025-06-01T10:00:00-04:00"),
        )
        .await
        .unwrap();

        let objects = backend.objects(WORK_URL);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].href, format!("{WORK_URL}{uid}.ics"));
        let data = &objects[0].data;
        assert!(data.contains("DTSTART;TZID=America/New_York:20250601T090000\r\n"));
        assert!(data.contains("DTEND;TZID=America/New_York:20250601T100000\r\n"));
        assert!(data.contains("PRODID:-//iCloud CalDAV MCP//EN\r\n"));
        assert!(!data.contains("DESCRIPTION"));
    }

    #[tokio::test]
    async fn test_explicit_tzid_and_description_are_written() {
        let backend = backend();
        let mut cmd = create("Lunch, maybe", "2025-06-01T12:00:00", "2025-06-01T13:00:00");
        cmd.tzid = Some("Europe/Berlin".into());
        cmd.description = Some("Bring; snacks".into());
        handle(&config(), &backend, cmd).await.unwrap();

        let data = &backend.objects(WORK_URL)[0].data;
        assert!(data.contains("SUMMARY:Lunch\\, maybe\r\n"));
        assert!(data.contains("DESCRIPTION:Bring\\; snacks\r\n"));
        assert!(data.contains("DTSTART;TZID=Europe/Berlin:20250601T120000\r\n"));
    }

    #[tokio::test]
    async fn test_unknown_calendar_url_surfaces_the_remote_error() {
        let backend = backend();
        let mut cmd = create("x", "2025-06-01T12:00:00", "2025-06-01T13:00:00");
        cmd.calendar_name_or_url = "https://p01-caldav.icloud.com/123/calendars/nope/".into();
        let err = handle(&config(), &backend, cmd).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
