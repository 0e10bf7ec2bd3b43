//! Local RRULE expansion for servers that return recurring events unexpanded.
//!
//! A calendar-query with `<C:expand>` should come back as one VEVENT per
//! occurrence. Some servers ignore the element and return the series master
//! (plus any overridden instances) as stored; those are expanded here into
//! the same shape, one VCALENDAR per occurrence, honouring EXDATE.

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use tracing::warn;

use crate::constants::EXPANSION_LIMIT;
use crate::error::{CalDavError, CalDavResult};
use crate::ics::parse::{IcsDateTime, Layout, ParsedEvent, first_event, split_occurrences};
use crate::window::TimeWindow;

/// One VCALENDAR per occurrence of every VEVENT in `content` inside `window`.
///
/// Objects without a recurring master are only split. A master whose rule
/// cannot be expanded is kept as a single piece.
pub fn expand_occurrences(content: &str, window: &TimeWindow) -> Vec<String> {
    let layout = Layout::read(content);
    let pieces: Vec<(String, Option<ParsedEvent>)> = layout
        .blocks
        .iter()
        .map(|block| {
            let text = layout.render(block);
            let event = first_event(&text);
            (text, event)
        })
        .collect();

    let has_master = pieces
        .iter()
        .any(|(_, event)| event.as_ref().is_some_and(ParsedEvent::is_recurring_master));
    if !has_master {
        return split_occurrences(content);
    }

    let overridden: Vec<DateTime<Utc>> = pieces
        .iter()
        .filter_map(|(_, event)| event.as_ref()?.recurrence_id.as_ref())
        .map(IcsDateTime::to_utc)
        .collect();

    let mut out = Vec::new();
    for (block, (text, event)) in layout.blocks.iter().zip(pieces) {
        match event {
            Some(event) if event.is_recurring_master() => {
                match expand_master(&layout, block, &event, window, &overridden) {
                    Ok(occurrences) => out.extend(occurrences),
                    Err(e) => {
                        warn!(uid = ?event.uid, error = %e, "keeping recurring event unexpanded");
                        out.push(text);
                    }
                }
            }
            Some(event) if event.recurrence_id.is_some() => {
                if let Some(start) = &event.start {
                    let end = event.end.as_ref().map(IcsDateTime::to_utc);
                    if window.overlaps(start.to_utc(), end) {
                        out.push(text);
                    }
                }
            }
            _ => out.push(text),
        }
    }
    out
}

fn expand_master(
    layout: &Layout<'_>,
    block: &[&str],
    master: &ParsedEvent,
    window: &TimeWindow,
    overridden: &[DateTime<Utc>],
) -> CalDavResult<Vec<String>> {
    let uid = master.uid.as_deref().unwrap_or_default();
    let (Some(start), Some(rule)) = (&master.start, &master.rrule) else {
        return Err(CalDavError::IcsParse(format!(
            "Recurring event '{uid}' has no DTSTART"
        )));
    };

    let rrule_set: RRuleSet = rrule_source(start, rule, &master.exdates)
        .parse()
        .map_err(|e| {
            CalDavError::IcsParse(format!("Failed to parse RRULE for event '{uid}': {e}"))
        })?;

    let span = master
        .end
        .as_ref()
        .map(|end| end.to_utc() - start.to_utc())
        .unwrap_or_else(Duration::zero);

    // after/before are exclusive; widen by a second and filter exactly below.
    let tz: rrule::Tz = Utc.into();
    let after = (window.start - span - Duration::seconds(1)).with_timezone(&tz);
    let before = (window.end + Duration::seconds(1)).with_timezone(&tz);
    let result = rrule_set.after(after).before(before).all(EXPANSION_LIMIT);
    if result.limited {
        warn!(uid, limit = EXPANSION_LIMIT, "recurrence expansion truncated");
    }

    let mut pieces = Vec::new();
    for occurrence in &result.dates {
        if overridden.contains(&occurrence.with_timezone(&Utc)) {
            continue;
        }
        let occ_start = occurrence_time(occurrence, start);
        let occ_end = master.end.as_ref().map(|_| shifted(&occ_start, span));
        if !window.overlaps(occ_start.to_utc(), occ_end.as_ref().map(IcsDateTime::to_utc)) {
            continue;
        }
        pieces.push(layout.render(&occurrence_block(block, &occ_start, occ_end.as_ref())));
    }
    Ok(pieces)
}

/// DTSTART/RRULE/EXDATE lines for the rrule parser. All-day and floating
/// times are read as UTC, so occurrences come back in the same frame.
fn rrule_source(start: &IcsDateTime, rule: &str, exdates: &[IcsDateTime]) -> String {
    let mut lines = vec![rrule_time("DTSTART", start), format!("RRULE:{rule}")];
    lines.extend(exdates.iter().map(|exdate| rrule_time("EXDATE", exdate)));
    lines.join("\n")
}

fn rrule_time(name: &str, value: &IcsDateTime) -> String {
    match value {
        IcsDateTime::Date(d) => format!("{name}:{}T000000Z", d.format("%Y%m%d")),
        IcsDateTime::Floating(dt) => format!("{name}:{}Z", dt.format("%Y%m%dT%H%M%S")),
        other => other.to_ics_property(name),
    }
}

/// An rrule occurrence in the same form as the master's DTSTART.
fn occurrence_time(dt: &DateTime<rrule::Tz>, master_start: &IcsDateTime) -> IcsDateTime {
    match master_start {
        IcsDateTime::Date(_) => IcsDateTime::Date(dt.date_naive()),
        IcsDateTime::Utc(_) => IcsDateTime::Utc(dt.with_timezone(&Utc)),
        IcsDateTime::Floating(_) => IcsDateTime::Floating(dt.naive_utc()),
        IcsDateTime::Zoned { tzid, .. } => IcsDateTime::Zoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}

fn shifted(start: &IcsDateTime, span: Duration) -> IcsDateTime {
    match start {
        IcsDateTime::Date(d) => IcsDateTime::Date(*d + span),
        IcsDateTime::Floating(dt) => IcsDateTime::Floating(*dt + span),
        IcsDateTime::Utc(dt) => IcsDateTime::Utc(*dt + span),
        IcsDateTime::Zoned { datetime, tzid } => IcsDateTime::Zoned {
            datetime: *datetime + span,
            tzid: tzid.clone(),
        },
    }
}

const SERIES_PROPERTIES: &[&str] = &["DTSTART", "DTEND", "RRULE", "RDATE", "EXDATE", "EXRULE"];

/// The master's VEVENT lines rewritten as one instance: new DTSTART/DTEND,
/// a RECURRENCE-ID, and no series properties. Folded continuation lines
/// follow their property.
fn occurrence_block(block: &[&str], start: &IcsDateTime, end: Option<&IcsDateTime>) -> Vec<String> {
    let mut lines = Vec::with_capacity(block.len() + 1);
    let mut dropping = false;

    for line in block {
        if line.starts_with(' ') || line.starts_with('\t') {
            if !dropping {
                lines.push(line.to_string());
            }
            continue;
        }

        let name = property_name(line);
        dropping = SERIES_PROPERTIES.contains(&name.as_str());
        match name.as_str() {
            "DTSTART" => {
                lines.push(start.to_ics_property("DTSTART"));
                lines.push(start.to_ics_property("RECURRENCE-ID"));
            }
            "DTEND" => lines.extend(end.map(|end| end.to_ics_property("DTEND"))),
            _ if !dropping => lines.push(line.to_string()),
            _ => {}
        }
    }
    lines
}

fn property_name(line: &str) -> String {
    line.split([';', ':'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn june(from: u32, to: u32) -> TimeWindow {
        TimeWindow::new(at(2025, 6, from), at(2025, 6, to))
    }

    fn starts(pieces: &[String]) -> Vec<String> {
        pieces
            .iter()
            .map(|p| first_event(p).unwrap().start.unwrap().to_iso())
            .collect()
    }

    const WEEKLY: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
SUMMARY:Sync\r\n\
DTSTART;TZID=America/New_York:20250602T090000\r\n\
DTEND;TZID=America/New_York:20250602T093000\r\n\
RRULE:FREQ=WEEKLY\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_master_expands_into_window() {
        let pieces = expand_occurrences(WEEKLY, &june(1, 20));
        assert_eq!(
            starts(&pieces),
            [
                "2025-06-02T09:00:00-04:00",
                "2025-06-09T09:00:00-04:00",
                "2025-06-16T09:00:00-04:00",
            ]
        );

        let second = &pieces[1];
        assert!(second.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(second.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(second.contains("RECURRENCE-ID;TZID=America/New_York:20250609T090000\r\n"));
        assert!(second.contains("DTEND;TZID=America/New_York:20250609T093000\r\n"));
        assert!(!second.contains("RRULE"));

        let event = first_event(second).unwrap();
        assert_eq!(event.uid.as_deref(), Some("weekly"));
        assert_eq!(event.summary.as_deref(), Some("Sync"));
        assert!(!event.is_recurring_master());
    }

    #[test]
    fn test_exdates_are_skipped() {
        let content = WEEKLY.replace(
            "RRULE:FREQ=WEEKLY\r\n",
            "RRULE:FREQ=WEEKLY\r\nEXDATE;TZID=America/New_York:20250609T090000\r\n",
        );
        let pieces = expand_occurrences(&content, &june(1, 20));
        assert_eq!(
            starts(&pieces),
            ["2025-06-02T09:00:00-04:00", "2025-06-16T09:00:00-04:00"]
        );
        assert!(pieces.iter().all(|p| !p.contains("EXDATE")));
    }

    #[test]
    fn test_overridden_instance_replaces_generated_one() {
        let content = WEEKLY.replace(
            "END:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n\
UID:weekly\r\n\
RECURRENCE-ID;TZID=America/New_York:20250609T090000\r\n\
SUMMARY:Sync (moved)\r\n\
DTSTART;TZID=America/New_York:20250610T140000\r\n\
DTEND;TZID=America/New_York:20250610T143000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n",
        );

        let pieces = expand_occurrences(&content, &june(1, 20));
        let summaries: Vec<String> = pieces
            .iter()
            .map(|p| first_event(p).unwrap().summary.unwrap())
            .collect();
        assert_eq!(summaries, ["Sync", "Sync", "Sync (moved)"]);
        assert_eq!(
            starts(&pieces),
            [
                "2025-06-02T09:00:00-04:00",
                "2025-06-16T09:00:00-04:00",
                "2025-06-10T14:00:00-04:00",
            ]
        );
    }

    #[test]
    fn test_occurrence_straddling_window_start_is_kept() {
        // 09:00-09:30 New York is 13:00-13:30 UTC.
        let window = TimeWindow::new(
            at(2025, 6, 9) + Duration::minutes(13 * 60 + 15),
            at(2025, 6, 10),
        );
        let pieces = expand_occurrences(WEEKLY, &window);
        assert_eq!(starts(&pieces), ["2025-06-09T09:00:00-04:00"]);
    }

    #[test]
    fn test_all_day_series() {
        let content = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:bins\r\n\
SUMMARY:Bins\r\n\
DTSTART;VALUE=DATE:20250601\r\n\
DTEND;VALUE=DATE:20250602\r\n\
RRULE:FREQ=DAILY;COUNT=3\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let pieces = expand_occurrences(content, &june(1, 30));
        assert_eq!(starts(&pieces), ["2025-06-01", "2025-06-02", "2025-06-03"]);
        assert!(pieces[2].contains("DTEND;VALUE=DATE:20250604\r\n"));
    }

    #[test]
    fn test_bad_rule_keeps_master() {
        let content = WEEKLY.replace("FREQ=WEEKLY", "FREQ=SOMETIMES");
        let pieces = expand_occurrences(&content, &june(1, 20));
        assert_eq!(pieces, vec![content.clone()]);
    }

    #[test]
    fn test_already_expanded_objects_are_only_split() {
        let content = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:a\r\n\
RECURRENCE-ID:20250602T130000Z\r\n\
DTSTART:20250602T130000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:a\r\n\
RECURRENCE-ID:20250609T130000Z\r\n\
DTSTART:20250609T130000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        // No master: pieces outside the window are not filtered either.
        let pieces = expand_occurrences(content, &june(1, 5));
        assert_eq!(pieces, split_occurrences(content));
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn test_folded_series_lines_are_dropped_whole() {
        let block = [
            "BEGIN:VEVENT",
            "UID:x",
            "DTSTART:20250602T130000Z",
            "RRULE:FREQ=WEEKLY;BYDAY=MO,",
            " TU",
            "DESCRIPTION:long",
            "  text",
            "END:VEVENT",
        ];
        let start = IcsDateTime::Utc(at(2025, 6, 3));
        let lines = occurrence_block(&block, &start, None);
        assert_eq!(
            lines,
            [
                "BEGIN:VEVENT",
                "UID:x",
                "DTSTART:20250603T000000Z",
                "RECURRENCE-ID:20250603T000000Z",
                "DESCRIPTION:long",
                "  text",
                "END:VEVENT",
            ]
        );
    }
}
