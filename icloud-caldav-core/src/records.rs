//! Plain data records returned by the tools.

use serde::{Deserialize, Serialize};

/// One calendar of the principal, as returned by `list_calendars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub name: Option<String>,
    pub url: String,
    /// Last non-empty path segment of `url`.
    pub id: Option<String>,
}

/// One event (or expanded occurrence), as returned by `list_events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Empty when the VEVENT has no UID.
    pub uid: String,
    /// Empty when the VEVENT has no SUMMARY.
    pub summary: String,
    /// ISO-8601; carries an offset when the source had a TZID or `Z`.
    pub start: Option<String>,
    pub end: Option<String>,
    /// The VCALENDAR text for this record.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// `"{calendar url}|{uid}"`, accepted back by `fetch`.
    pub id: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub id: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub content: String,
}
