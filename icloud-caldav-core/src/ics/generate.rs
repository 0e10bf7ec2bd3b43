//! ICS generation for event writes.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::constants::{PRODID, UID_SUFFIX};

/// Longest content line allowed before folding, in octets.
const MAX_LINE_OCTETS: usize = 75;

/// Everything needed to write a single-VEVENT calendar object.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    /// Wall-clock start, written verbatim with `TZID=tzid`.
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub tzid: String,
    pub dtstamp: DateTime<Utc>,
}

/// Fresh UID: 32 lowercase hex characters plus the local suffix.
pub fn new_uid() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), UID_SUFFIX)
}

/// Build the full VCALENDAR text, CRLF-terminated.
///
/// DESCRIPTION is only written when non-empty.
pub fn build_event_ics(draft: &EventDraft) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", draft.uid),
        format!("DTSTAMP:{}", draft.dtstamp.format("%Y%m%dT%H%M%SZ")),
        format!("SUMMARY:{}", escape_text(&draft.summary)),
        format!(
            "DTSTART;TZID={}:{}",
            draft.tzid,
            draft.start.format("%Y%m%dT%H%M%S")
        ),
        format!(
            "DTEND;TZID={}:{}",
            draft.tzid,
            draft.end.format("%Y%m%dT%H%M%S")
        ),
    ];

    if let Some(desc) = draft.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("DESCRIPTION:{}", escape_text(desc)));
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Escape a TEXT value: backslash first, then newline, comma, semicolon.
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Fold a content line at 75 octets without splitting a UTF-8 character.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    // Continuation lines start with a space, which counts toward the limit.
    let mut limit = MAX_LINE_OCTETS;

    for ch in line.chars() {
        let width = ch.len_utf8();
        if used + width > limit {
            out.push_str("\r\n ");
            used = 0;
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(ch);
        used += width;
    }

    out
}
