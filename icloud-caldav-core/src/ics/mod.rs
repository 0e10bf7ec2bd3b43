//! ICS text generation and parsing.
//!
//! Writes are assembled by hand (one VEVENT, TZID-qualified local times);
//! reads go through the icalendar crate's parser.

mod generate;
mod parse;
mod recurrence;

pub use generate::{EventDraft, build_event_ics, escape_text, fold_line, new_uid};
pub use parse::{IcsDateTime, ParsedEvent, first_event, parse_events, split_occurrences, unescape_text};
pub use recurrence::expand_occurrences;
