//! Replace an existing event found by UID.
//!
//! The replacement body carries only UID, SUMMARY, DTSTART, DTEND and
//! DESCRIPTION; any other property of the stored event (RRULE, VALARM,
//! ATTENDEE, ...) is dropped.

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use icloud_caldav_core::ics::{EventDraft, build_event_ics};
use icloud_caldav_core::protocol::UpdateEvent;
use icloud_caldav_core::{ServerConfig, TimeWindow, Timestamp};
use tracing::debug;

use crate::backend::CalDavBackend;
use crate::commands::find_event;
use crate::resolver::resolve_calendar;

pub async fn handle(
    config: &ServerConfig,
    backend: &dyn CalDavBackend,
    cmd: UpdateEvent,
) -> Result<bool> {
    let start_override = cmd.start.as_deref().map(Timestamp::parse).transpose()?;
    let end_override = cmd.end.as_deref().map(Timestamp::parse).transpose()?;

    let calendar = resolve_calendar(backend, &cmd.calendar_name_or_url).await?;
    let window = TimeWindow::lookup()?;

    let Some((object, existing)) =
        find_event(backend, &calendar, &window, |uid| uid == cmd.uid).await?
    else {
        debug!(uid = %cmd.uid, "no event to update");
        return Ok(false);
    };

    let start = match start_override {
        Some(ts) => ts.wall_clock(),
        None => existing
            .start
            .as_ref()
            .map(|t| t.wall_clock())
            .ok_or_else(|| anyhow!("Event {} has no DTSTART", cmd.uid))?,
    };

    let end = match end_override {
        Some(ts) => ts.wall_clock(),
        None => existing
            .end
            .as_ref()
            .map(|t| t.wall_clock())
            .unwrap_or(start + Duration::hours(1)),
    };

    let tzid = cmd
        .tzid
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            existing
                .start
                .as_ref()
                .and_then(|t| t.tzid())
                .map(str::to_string)
        })
        .unwrap_or_else(|| config.default_tzid.clone());

    let draft = EventDraft {
        uid: cmd.uid,
        summary: cmd.summary.or(existing.summary).unwrap_or_default(),
        description: cmd.description.or(existing.description),
        start,
        end,
        tzid,
        dtstamp: Utc::now(),
    };

    backend
        .replace_object(&calendar, &object, &build_event_ics(&draft))
        .await?;

    debug!(uid = %draft.uid, calendar = %calendar.url, "updated event");
    Ok(true)
}
