//! Time windows for calendar queries.

use chrono::{DateTime, TimeDelta, Utc};

use crate::constants::{DAYS_PER_YEAR, LOOKBACK_YEARS};
use crate::error::{CalDavError, CalDavResult};

/// A half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeWindow { start, end }
    }

    /// ±`days` around the current instant.
    ///
    /// Fails for negative `days` or a window past chrono's representable range.
    pub fn around_now(days: i64) -> CalDavResult<Self> {
        Self::around(Utc::now(), days)
    }

    fn around(center: DateTime<Utc>, days: i64) -> CalDavResult<Self> {
        let out_of_range = || CalDavError::WindowOutOfRange(days);
        let span = TimeDelta::try_days(days)
            .filter(|span| *span >= TimeDelta::zero())
            .ok_or_else(out_of_range)?;

        Ok(TimeWindow {
            start: center.checked_sub_signed(span).ok_or_else(out_of_range)?,
            end: center.checked_add_signed(span).ok_or_else(out_of_range)?,
        })
    }

    /// The window scanned when looking an event up by UID (update/delete).
    /// Events outside it are not found.
    pub fn lookup() -> CalDavResult<Self> {
        Self::around_now(LOOKBACK_YEARS * DAYS_PER_YEAR)
    }

    /// `start` in CalDAV time-range format: `YYYYMMDDTHHMMSSZ`
    pub fn start_caldav(&self) -> String {
        format_caldav(self.start)
    }

    /// `end` in CalDAV time-range format: `YYYYMMDDTHHMMSSZ`
    pub fn end_caldav(&self) -> String {
        format_caldav(self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether `[start, end)` intersects the window. An event without an
    /// end, or with `end <= start`, is a point at `start`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        match end {
            Some(end) if end > start => start < self.end && end > self.start,
            _ => self.contains(start),
        }
    }
}

fn format_caldav(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_caldav_formatting() {
        let window = TimeWindow::new(at(2025, 6, 1, 0), at(2025, 6, 2, 13));
        assert_eq!(window.start_caldav(), "20250601T000000Z");
        assert_eq!(window.end_caldav(), "20250602T130000Z");
    }

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::new(at(2025, 6, 1, 0), at(2025, 6, 2, 0));
        assert!(window.contains(at(2025, 6, 1, 0)));
        assert!(window.contains(at(2025, 6, 1, 23)));
        assert!(!window.contains(at(2025, 6, 2, 0)));
    }

    #[test]
    fn test_lookup_window_spans_three_years_each_way() {
        let window = TimeWindow::lookup().unwrap();
        assert_eq!(window.end - window.start, TimeDelta::days(2 * 3 * 365));
        assert!(window.contains(Utc::now()));
    }

    #[test]
    fn test_unrepresentable_windows_are_errors() {
        for days in [-1, 1_000_000_000, i64::MAX] {
            let err = TimeWindow::around_now(days).unwrap_err();
            assert!(matches!(err, CalDavError::WindowOutOfRange(d) if d == days));
        }
        let center = at(2025, 6, 1, 0);
        let window = TimeWindow::around(center, 0).unwrap();
        assert_eq!((window.start, window.end), (center, center));
    }

    #[test]
    fn test_overlap_of_spans_and_points() {
        let window = TimeWindow::new(at(2025, 6, 1, 0), at(2025, 6, 2, 0));
        assert!(window.overlaps(at(2025, 5, 31, 23), Some(at(2025, 6, 1, 1))));
        assert!(!window.overlaps(at(2025, 5, 31, 0), Some(at(2025, 6, 1, 0))));
        assert!(!window.overlaps(at(2025, 6, 2, 0), Some(at(2025, 6, 2, 1))));
        assert!(window.overlaps(at(2025, 6, 1, 5), None));
        assert!(!window.overlaps(at(2025, 6, 2, 0), Some(at(2025, 6, 2, 0))));
    }
}
