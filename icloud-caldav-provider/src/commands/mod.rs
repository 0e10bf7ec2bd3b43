//! Tool handlers, one module per tool.

pub mod create_event;
pub mod delete_event;
pub mod fetch;
pub mod list_calendars;
pub mod list_events;
pub mod search;
pub mod update_event;

use anyhow::{Context, Result, anyhow};
use icloud_caldav_core::ics::{ParsedEvent, first_event};
use icloud_caldav_core::protocol::{Command, ToolCommand};
use icloud_caldav_core::{EventRecord, ServerConfig, TimeWindow};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{CalDavBackend, CalendarObject, Connector, RemoteCalendar};

/// Run one tool call: parse arguments, connect, handle, serialize.
///
/// Arguments are validated before any connection is made.
pub async fn dispatch(
    config: &ServerConfig,
    connector: &dyn Connector,
    command: Command,
    params: Value,
) -> Result<Value> {
    debug!(tool = command.name(), "tool call");

    match command {
        Command::ListCalendars => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(list_calendars::handle(backend.as_ref(), cmd).await?)
        }
        Command::ListEvents => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(list_events::handle(config, backend.as_ref(), cmd).await?)
        }
        Command::CreateEvent => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(create_event::handle(config, backend.as_ref(), cmd).await?)
        }
        Command::UpdateEvent => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(update_event::handle(config, backend.as_ref(), cmd).await?)
        }
        Command::DeleteEvent => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(delete_event::handle(backend.as_ref(), cmd).await?)
        }
        Command::Search => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(search::handle(config, backend.as_ref(), cmd).await?)
        }
        Command::Fetch => {
            let cmd = parse_params(params)?;
            let backend = connector.connect(config)?;
            respond(fetch::handle(config, backend.as_ref(), cmd).await?)
        }
    }
}

fn parse_params<T: ToolCommand>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| anyhow!("Invalid params for {}: {}", T::command().name(), e))
}

fn respond<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize tool result")
}

/// Linear scan of `window` (no expansion) for the first object whose first
/// VEVENT has a UID accepted by `matches`.
pub(crate) async fn find_event(
    backend: &dyn CalDavBackend,
    calendar: &RemoteCalendar,
    window: &TimeWindow,
    matches: impl Fn(&str) -> bool,
) -> Result<Option<(CalendarObject, ParsedEvent)>> {
    let objects = backend.query_objects(calendar, window, false).await?;

    for object in objects {
        let Some(event) = first_event(&object.data) else {
            warn!(href = %object.href, "skipping unparseable calendar object");
            continue;
        };
        if event.uid.as_deref().is_some_and(&matches) {
            return Ok(Some((object, event)));
        }
    }

    Ok(None)
}

/// Shape one VCALENDAR text into a record, from its first VEVENT.
pub(crate) fn event_record(data: &str) -> Option<EventRecord> {
    let Some(event) = first_event(data) else {
        warn!("skipping unparseable calendar object");
        return None;
    };

    Some(EventRecord {
        uid: event.uid.unwrap_or_default(),
        summary: event.summary.unwrap_or_default(),
        start: event.start.map(|t| t.to_iso()),
        end: event.end.map(|t| t.to_iso()),
        raw: data.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use icloud_caldav_core::{Profile, ServerConfig};
    use secrecy::Secret;

    use crate::memory::MemoryBackend;

    pub const WORK_URL: &str = "https://p01-caldav.icloud.com/123/calendars/work/";
    pub const HOME_URL: &str = "https://p01-caldav.icloud.com/123/calendars/home/";

    pub fn config() -> ServerConfig {
        ServerConfig {
            apple_id: "me@icloud.com".into(),
            app_password: Secret::new("pw".into()),
            caldav_url: "https://caldav.icloud.com".into(),
            default_tzid: "America/New_York".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            profile: Profile::Write,
            scan_days: 3 * 365,
        }
    }

    pub fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_calendar(Some("Work"), WORK_URL)
            .with_calendar(Some("Home"), HOME_URL)
    }

    /// A single-event object in the layout iCloud stores.
    pub fn vevent(uid: &str, summary: &str, start: &str, end: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//Apple Inc.//iCloud//EN\r\n\
             BEGIN:VEVENT\r\n\
             UID:{uid}\r\n\
             SUMMARY:{summary}\r\n\
             DTSTART;TZID=America/New_York:{start}\r\n\
             DTEND;TZID=America/New_York:{end}\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_rejects_bad_arguments_before_connecting() {
        let backend = backend();
        let err = dispatch(
            &config(),
            &backend,
            Command::ListEvents,
            json!({"calendar": "Work"}),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Invalid params for list_events"));
        assert_eq!(backend.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_serializes_handler_output() {
        let backend = backend();
        let value = dispatch(&config(), &backend, Command::ListCalendars, Value::Null)
            .await
            .unwrap();
        assert_eq!(value[0]["name"], "Work");
        assert_eq!(value[0]["id"], "work");
        assert_eq!(value[1]["url"], HOME_URL);
    }

    #[tokio::test]
    async fn test_dispatch_propagates_timestamp_errors() {
        let backend = backend();
        let err = dispatch(
            &config(),
            &backend,
            Command::CreateEvent,
            json!({
                "calendar": "Work",
                "summary": "x",
                "start": "next tuesday",
                "end": "2025-06-01T10:00:00"
            }),
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid ISO datetime 'next tuesday'"));
        assert!(backend.objects(WORK_URL).is_empty());
    }
}
