//! The tool registry exposed over `tools/list` and `tools/call`.
//!
//! One of two fixed sets is chosen at startup from the profile; a tool
//! outside the active set is unknown, not forbidden.

use icloud_caldav_core::mcp::{ToolDef, ToolsCallResult};
use icloud_caldav_core::protocol::Command;
use icloud_caldav_core::{Profile, ServerConfig};
use icloud_caldav_provider::{Connector, dispatch};
use serde_json::{Value, json};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ToolSet {
    commands: &'static [Command],
}

impl ToolSet {
    pub fn for_profile(profile: Profile) -> Self {
        ToolSet {
            commands: Command::for_profile(profile),
        }
    }

    /// Resolve a tool name against the active set.
    pub fn lookup(&self, name: &str) -> Option<Command> {
        Command::from_name(name).filter(|c| self.commands.contains(c))
    }

    pub fn definitions(&self) -> Vec<ToolDef> {
        self.commands.iter().map(|c| definition(*c)).collect()
    }

    /// Run a tool. Handler failures become `isError` results.
    pub async fn call(
        &self,
        config: &ServerConfig,
        connector: &dyn Connector,
        command: Command,
        arguments: Value,
    ) -> ToolsCallResult {
        match dispatch(config, connector, command, arguments).await {
            Ok(value) => ToolsCallResult::success(value),
            Err(e) => {
                warn!(tool = command.name(), error = %format!("{:#}", e), "tool call failed");
                ToolsCallResult::error(format!("{:#}", e))
            }
        }
    }
}

const CALENDAR_ARG: &str = "Calendar display name or absolute calendar URL";
const TIME_ARG: &str =
    "ISO-8601 datetime: naive local (2025-06-01T09:00:00), UTC (...Z) or with offset (...-04:00)";

fn definition(command: Command) -> ToolDef {
    let (description, input_schema) = match command {
        Command::ListCalendars => (
            "List the account's calendars as {name, url, id}.",
            json!({"type": "object", "properties": {}}),
        ),
        Command::ListEvents => (
            "List events in a calendar overlapping [start, end). \
             Recurring events are expanded into occurrences unless expand_recurring is false.",
            json!({
                "type": "object",
                "properties": {
                    "calendar_name_or_url": {"type": "string", "description": CALENDAR_ARG},
                    "start": {"type": "string", "description": TIME_ARG},
                    "end": {"type": "string", "description": TIME_ARG},
                    "expand_recurring": {"type": "boolean", "default": true}
                },
                "required": ["calendar_name_or_url", "start", "end"]
            }),
        ),
        Command::CreateEvent => (
            "Create an event and return its UID. Times are written as given, \
             in tzid (default: the server's timezone).",
            json!({
                "type": "object",
                "properties": {
                    "calendar_name_or_url": {"type": "string", "description": CALENDAR_ARG},
                    "summary": {"type": "string"},
                    "start": {"type": "string", "description": TIME_ARG},
                    "end": {"type": "string", "description": TIME_ARG},
                    "tzid": {"type": "string", "description": "IANA timezone, e.g. America/New_York"},
                    "description": {"type": "string"}
                },
                "required": ["calendar_name_or_url", "summary", "start", "end"]
            }),
        ),
        Command::UpdateEvent => (
            "Update an event by UID, keeping fields that are not given. \
             Returns false when no event has that UID within three years of today. \
             Properties other than summary, times and description are not kept.",
            json!({
                "type": "object",
                "properties": {
                    "calendar_name_or_url": {"type": "string", "description": CALENDAR_ARG},
                    "uid": {"type": "string"},
                    "summary": {"type": "string"},
                    "start": {"type": "string", "description": TIME_ARG},
                    "end": {"type": "string", "description": TIME_ARG},
                    "tzid": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["calendar_name_or_url", "uid"]
            }),
        ),
        Command::DeleteEvent => (
            "Delete an event by UID. Returns false when no event has that UID.",
            json!({
                "type": "object",
                "properties": {
                    "calendar_name_or_url": {"type": "string", "description": CALENDAR_ARG},
                    "uid": {"type": "string"}
                },
                "required": ["calendar_name_or_url", "uid"]
            }),
        ),
        Command::Search => (
            "Search event titles and descriptions across all calendars. \
             Returns up to 200 hits as {id, title, snippet}.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        ),
        Command::Fetch => (
            "Fetch the raw iCalendar text for ids returned by search.",
            json!({
                "type": "object",
                "properties": {
                    "ids": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["ids"]
            }),
        ),
    };

    ToolDef {
        name: command.name().to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}
