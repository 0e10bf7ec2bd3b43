/// Standard iCloud CalDAV endpoint.
pub const DEFAULT_CALDAV_URL: &str = "https://caldav.icloud.com";

pub const DEFAULT_TZID: &str = "America/New_York";

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8000;

/// Half-width, in years, of the window scanned when looking an event up by UID.
pub const LOOKBACK_YEARS: i64 = 3;

pub const DAYS_PER_YEAR: i64 = 365;

/// Default half-width, in days, of the search/fetch window.
pub const DEFAULT_SCAN_DAYS: i64 = LOOKBACK_YEARS * DAYS_PER_YEAR;

/// Largest accepted `SCAN_DAYS`.
pub const MAX_SCAN_DAYS: i64 = 365_000;

/// Most occurrences generated for one recurring event in one query.
pub const EXPANSION_LIMIT: u16 = 4000;

/// Appended to every locally generated event UID.
pub const UID_SUFFIX: &str = "@icloud-caldav-mcp";

pub const PRODID: &str = "-//iCloud CalDAV MCP//EN";

pub const CALENDAR_MIME_TYPE: &str = "text/calendar";

pub const SEARCH_RESULT_LIMIT: usize = 200;

pub const SEARCH_TITLE_MAX_CHARS: usize = 200;
