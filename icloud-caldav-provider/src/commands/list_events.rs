//! List events overlapping a time window.
//!
//! Naive bounds are read in the configured default timezone. With expansion
//! each occurrence becomes its own record, carrying a VCALENDAR with only
//! that occurrence. Series the server returned unexpanded are expanded here.

use anyhow::Result;
use icloud_caldav_core::ics::expand_occurrences;
use icloud_caldav_core::protocol::ListEvents;
use icloud_caldav_core::{EventRecord, ServerConfig, TimeWindow, Timestamp};

use crate::backend::CalDavBackend;
use crate::commands::event_record;
use crate::resolver::resolve_calendar;

pub async fn handle(
    config: &ServerConfig,
    backend: &dyn CalDavBackend,
    cmd: ListEvents,
) -> Result<Vec<EventRecord>> {
    let zone = config.default_tz();
    let start = Timestamp::parse(&cmd.start)?.to_utc(zone);
    let end = Timestamp::parse(&cmd.end)?.to_utc(zone);
    let window = TimeWindow::new(start, end);

    let calendar = resolve_calendar(backend, &cmd.calendar_name_or_url).await?;
    let objects = backend
        .query_objects(&calendar, &window, cmd.expand_recurring)
        .await?;

    let mut records = Vec::new();
    for object in &objects {
        if cmd.expand_recurring {
            records.extend(
                expand_occurrences(&object.data, &window)
                    .iter()
                    .filter_map(|piece| event_record(piece)),
            );
        } else {
            records.extend(event_record(&object.data));
        }
    }

    Ok(records)
}
