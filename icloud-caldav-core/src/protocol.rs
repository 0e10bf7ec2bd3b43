//! Tool commands and their parameters.
//!
//! Each tool call arrives as a name plus a JSON object of arguments. The
//! name selects a [`Command`]; the arguments deserialize into the matching
//! parameter struct.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::Profile;
use crate::records::{CalendarRecord, EventRecord, FetchedDocument, SearchHit};

pub trait ToolCommand: DeserializeOwned {
    type Response: Serialize;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListCalendars,
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    Search,
    Fetch,
}

impl Command {
    pub const WRITE_SET: &'static [Command] = &[
        Command::ListCalendars,
        Command::ListEvents,
        Command::CreateEvent,
        Command::UpdateEvent,
        Command::DeleteEvent,
    ];

    pub const READ_ONLY_SET: &'static [Command] = &[Command::Search, Command::Fetch];

    /// The tools registered for a profile.
    pub fn for_profile(profile: Profile) -> &'static [Command] {
        match profile {
            Profile::Write => Self::WRITE_SET,
            Profile::ReadOnly => Self::READ_ONLY_SET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ListCalendars => "list_calendars",
            Command::ListEvents => "list_events",
            Command::CreateEvent => "create_event",
            Command::UpdateEvent => "update_event",
            Command::DeleteEvent => "delete_event",
            Command::Search => "search",
            Command::Fetch => "fetch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::WRITE_SET, Self::READ_ONLY_SET]
            .concat()
            .into_iter()
            .find(|c| c.name() == name)
    }
}

// ============================================================================
// Write profile
// ============================================================================

/// List the principal's calendars.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListCalendars {}

impl ToolCommand for ListCalendars {
    type Response = Vec<CalendarRecord>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

fn default_true() -> bool {
    true
}

/// List events overlapping `[start, end)`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    #[serde(alias = "calendar")]
    pub calendar_name_or_url: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_true")]
    pub expand_recurring: bool,
}

impl ToolCommand for ListEvents {
    type Response = Vec<EventRecord>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// Create an event. Returns its new UID.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(alias = "calendar")]
    pub calendar_name_or_url: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub tzid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ToolCommand for CreateEvent {
    type Response = String;
    fn command() -> Command {
        Command::CreateEvent
    }
}

/// Replace an event found by UID. Unset fields keep their current values.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(alias = "calendar")]
    pub calendar_name_or_url: String,
    pub uid: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub tzid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ToolCommand for UpdateEvent {
    type Response = bool;
    fn command() -> Command {
        Command::UpdateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(alias = "calendar")]
    pub calendar_name_or_url: String,
    pub uid: String,
}

impl ToolCommand for DeleteEvent {
    type Response = bool;
    fn command() -> Command {
        Command::DeleteEvent
    }
}

// ============================================================================
// Read-only profile
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub query: Option<String>,
}

impl ToolCommand for Search {
    type Response = Vec<SearchHit>;
    fn command() -> Command {
        Command::Search
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Fetch {
    #[serde(default)]
    pub ids: Vec<String>,
}

impl ToolCommand for Fetch {
    type Response = Vec<FetchedDocument>;
    fn command() -> Command {
        Command::Fetch
    }
}
