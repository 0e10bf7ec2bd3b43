//! ISO-8601 timestamps as accepted in tool arguments.
//!
//! Three spellings are accepted:
//! - naive local: `2025-06-01T09:00:00` (also without seconds, or a bare date)
//! - UTC: `2025-06-01T09:00:00Z`
//! - offset-qualified: `2025-06-01T09:00:00-04:00`

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CalDavError, CalDavResult};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// A parsed tool-argument timestamp.
///
/// The literal date/time fields are always kept: ICS output is written from
/// them, never from a UTC-normalized instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// No zone information.
    Naive(NaiveDateTime),
    /// `Z` or an explicit offset.
    Offset(DateTime<FixedOffset>),
}

impl Timestamp {
    pub fn parse(input: &str) -> CalDavResult<Self> {
        let s = input.trim();

        if let Some(body) = s.strip_suffix('Z') {
            let naive =
                parse_naive(body).ok_or_else(|| CalDavError::InvalidTimestamp(input.to_string()))?;
            return Ok(Timestamp::Offset(Utc.from_utc_datetime(&naive).fixed_offset()));
        }

        if let Some(naive) = parse_naive(s) {
            return Ok(Timestamp::Naive(naive));
        }

        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
            .map(Timestamp::Offset)
            .ok_or_else(|| CalDavError::InvalidTimestamp(input.to_string()))
    }

    /// The wall-clock fields as written by the caller.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(naive) => *naive,
            Timestamp::Offset(dt) => dt.naive_local(),
        }
    }

    /// Convert to an instant. Naive values are read in `zone` (UTC when unknown).
    pub fn to_utc(&self, zone: Option<Tz>) -> DateTime<Utc> {
        match self {
            Timestamp::Offset(dt) => dt.with_timezone(&Utc),
            Timestamp::Naive(naive) => match zone {
                Some(tz) => tz
                    .from_local_datetime(naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| naive.and_utc()),
                None => naive.and_utc(),
            },
        }
    }

    /// `YYYYMMDDTHHMMSS` from the wall-clock fields, as used in `DTSTART;TZID=...`.
    pub fn to_ics_local(&self) -> String {
        self.wall_clock().format("%Y%m%dT%H%M%S").to_string()
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
