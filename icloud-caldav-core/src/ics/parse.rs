//! ICS parsing using the icalendar crate's parser.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

/// A DTSTART/DTEND value, keeping the zone information it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcsDateTime {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl IcsDateTime {
    /// The local wall-clock reading (midnight for all-day values).
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            IcsDateTime::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            IcsDateTime::Floating(dt) => *dt,
            IcsDateTime::Utc(dt) => dt.naive_utc(),
            IcsDateTime::Zoned { datetime, .. } => *datetime,
        }
    }

    pub fn tzid(&self) -> Option<&str> {
        match self {
            IcsDateTime::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// ISO-8601 rendering. Zoned values carry their resolved offset; a TZID
    /// unknown to the tz database renders like a floating time.
    pub fn to_iso(&self) -> String {
        match self {
            IcsDateTime::Date(d) => d.format("%Y-%m-%d").to_string(),
            IcsDateTime::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            IcsDateTime::Utc(dt) => dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
            IcsDateTime::Zoned { datetime, tzid } => match resolve(*datetime, tzid) {
                Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
                None => datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
            },
        }
    }

    /// The value as an iCalendar property line, e.g. `DTSTART;TZID=Europe/Paris:20250601T090000`.
    pub fn to_ics_property(&self, name: &str) -> String {
        match self {
            IcsDateTime::Date(d) => format!("{name};VALUE=DATE:{}", d.format("%Y%m%d")),
            IcsDateTime::Floating(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%S")),
            IcsDateTime::Utc(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%SZ")),
            IcsDateTime::Zoned { datetime, tzid } => {
                format!("{name};TZID={tzid}:{}", datetime.format("%Y%m%dT%H%M%S"))
            }
        }
    }

    /// The instant this value denotes; floating and unresolvable values read as UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            IcsDateTime::Utc(dt) => *dt,
            IcsDateTime::Zoned { datetime, tzid } => resolve(*datetime, tzid)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| datetime.and_utc()),
            other => other.wall_clock().and_utc(),
        }
    }
}

fn resolve(datetime: NaiveDateTime, tzid: &str) -> Option<DateTime<Tz>> {
    let tz: Tz = tzid.parse().ok()?;
    tz.from_local_datetime(&datetime).earliest()
}

impl From<DatePerhapsTime> for IcsDateTime {
    fn from(dpt: DatePerhapsTime) -> Self {
        match dpt {
            DatePerhapsTime::Date(d) => IcsDateTime::Date(d),
            DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
                CalendarDateTime::Utc(dt) => IcsDateTime::Utc(dt),
                CalendarDateTime::Floating(naive) => IcsDateTime::Floating(naive),
                CalendarDateTime::WithTimezone { date_time, tzid } => IcsDateTime::Zoned {
                    datetime: date_time,
                    tzid,
                },
            },
        }
    }
}

/// The handful of VEVENT properties the tools surface, plus what
/// recurrence expansion needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<IcsDateTime>,
    pub end: Option<IcsDateTime>,
    pub rrule: Option<String>,
    pub exdates: Vec<IcsDateTime>,
    pub recurrence_id: Option<IcsDateTime>,
}

impl ParsedEvent {
    /// A series definition rather than a single instance.
    pub fn is_recurring_master(&self) -> bool {
        self.rrule.is_some() && self.recurrence_id.is_none()
    }
}

/// Every VEVENT in a calendar object, in document order.
///
/// Returns `None` when the text is not a parseable VCALENDAR.
pub fn parse_events(content: &str) -> Option<Vec<ParsedEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;

    Some(
        calendar
            .components
            .iter()
            .filter(|c| c.name == "VEVENT")
            .map(to_parsed_event)
            .collect(),
    )
}

/// The first VEVENT of a calendar object.
pub fn first_event(content: &str) -> Option<ParsedEvent> {
    parse_events(content)?.into_iter().next()
}

fn to_parsed_event(vevent: &Component) -> ParsedEvent {
    ParsedEvent {
        uid: text_prop(vevent, "UID"),
        summary: text_prop(vevent, "SUMMARY"),
        description: text_prop(vevent, "DESCRIPTION"),
        start: time_prop(vevent, "DTSTART"),
        end: time_prop(vevent, "DTEND"),
        rrule: vevent.find_prop("RRULE").map(|p| p.val.to_string()),
        exdates: vevent
            .properties
            .iter()
            .filter(|p| p.name == "EXDATE")
            .flat_map(exdate_values)
            .collect(),
        recurrence_id: time_prop(vevent, "RECURRENCE-ID"),
    }
}

fn text_prop(vevent: &Component, name: &str) -> Option<String> {
    vevent
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
}

fn time_prop(vevent: &Component, name: &str) -> Option<IcsDateTime> {
    let prop: &Property = vevent.find_prop(name)?;
    DatePerhapsTime::try_from(prop).ok().map(IcsDateTime::from)
}

/// Every value of an EXDATE property, which may list several.
fn exdate_values(prop: &Property) -> Vec<IcsDateTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));
    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                return NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(IcsDateTime::Date);
            }
            if let Some(utc) = s.strip_suffix('Z') {
                return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| IcsDateTime::Utc(dt.and_utc()));
            }
            let datetime = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()?;
            Some(match &tzid {
                Some(tzid) => IcsDateTime::Zoned {
                    datetime,
                    tzid: tzid.clone(),
                },
                None => IcsDateTime::Floating(datetime),
            })
        })
        .collect()
}

/// Reverse of `escape_text`: `\\`, `\n`/`\N`, `\,` and `\;`.
///
/// An unrecognized escape keeps its backslash.
pub fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') => result.push('\\'),
            Some('n') | Some('N') => result.push('\n'),
            _ => {
                result.push(c);
                continue;
            }
        }
        chars.next();
    }

    result
}

/// A calendar object cut into its VEVENT blocks and the lines around them.
///
/// `head` is everything before the closing `END:VCALENDAR` that is not part
/// of a VEVENT (header, VTIMEZONE blocks); `tail` is the closing line.
pub(crate) struct Layout<'a> {
    head: Vec<&'a str>,
    pub(crate) blocks: Vec<Vec<&'a str>>,
    tail: Vec<&'a str>,
}

impl<'a> Layout<'a> {
    pub(crate) fn read(content: &'a str) -> Self {
        let mut shell: Vec<&str> = Vec::new();
        let mut blocks: Vec<Vec<&str>> = Vec::new();
        let mut current: Option<Vec<&str>> = None;

        for line in content.lines() {
            match current.take() {
                Some(mut block) => {
                    block.push(line);
                    if line.trim_end() == "END:VEVENT" {
                        blocks.push(block);
                    } else {
                        current = Some(block);
                    }
                }
                None if line.trim_end() == "BEGIN:VEVENT" => current = Some(vec![line]),
                None => shell.push(line),
            }
        }

        let footer = shell
            .iter()
            .rposition(|l| l.trim_end() == "END:VCALENDAR")
            .unwrap_or(shell.len());
        let tail = shell.split_off(footer);

        Layout {
            head: shell,
            blocks,
            tail,
        }
    }

    /// A CRLF-terminated VCALENDAR holding only `block`.
    pub(crate) fn render<S: AsRef<str>>(&self, block: &[S]) -> String {
        let mut out = String::new();
        let lines = self
            .head
            .iter()
            .copied()
            .chain(block.iter().map(|l| l.as_ref()))
            .chain(self.tail.iter().copied());
        for line in lines {
            out.push_str(line.trim_end_matches('\r'));
            out.push_str("\r\n");
        }
        out
    }
}

/// Split a calendar object holding several VEVENTs (as returned by a
/// server-side expansion) into one VCALENDAR per VEVENT.
///
/// Each piece keeps every non-VEVENT line of the original (header,
/// VTIMEZONE blocks). Objects with at most one VEVENT come back unchanged.
pub fn split_occurrences(content: &str) -> Vec<String> {
    let layout = Layout::read(content);
    if layout.blocks.len() <= 1 {
        return vec![content.to_string()];
    }
    layout.blocks.iter().map(|block| layout.render(block)).collect()
}
