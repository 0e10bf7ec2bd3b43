//! The seam between tool handlers and a CalDAV server.
//!
//! Handlers only talk to [`CalDavBackend`]; the libdav implementation
//! lives in `icloud`, and an in-memory one backs the tests.

use anyhow::Result;
use async_trait::async_trait;
use icloud_caldav_core::{CalendarRecord, ServerConfig, TimeWindow};

use crate::caldav::last_path_segment;

/// A calendar collection of the principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCalendar {
    pub name: Option<String>,
    /// Absolute collection URL.
    pub url: String,
}

impl RemoteCalendar {
    pub fn new(name: Option<String>, url: impl Into<String>) -> Self {
        RemoteCalendar {
            name,
            url: url.into(),
        }
    }

    /// A handle built from caller input, without any validation.
    pub fn from_url(url: &str) -> Self {
        RemoteCalendar {
            name: None,
            url: url.to_string(),
        }
    }

    pub fn id(&self) -> Option<String> {
        last_path_segment(&self.url)
    }

    /// Display name, falling back to the URL.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn to_record(&self) -> CalendarRecord {
        CalendarRecord {
            name: self.name.clone(),
            url: self.url.clone(),
            id: self.id(),
        }
    }
}

/// One calendar object resource (`.ics`) as stored on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    pub href: String,
    pub etag: Option<String>,
    /// Full VCALENDAR text.
    pub data: String,
}

/// CalDAV operations the tools need.
///
/// This allows mocking in tests without a real server.
#[async_trait]
pub trait CalDavBackend: Send + Sync {
    /// All calendars of the authenticated principal, in server order.
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>>;

    /// Objects with a VEVENT overlapping `window`.
    ///
    /// With `expand`, recurring events come back as one VEVENT per
    /// occurrence inside the window.
    async fn query_objects(
        &self,
        calendar: &RemoteCalendar,
        window: &TimeWindow,
        expand: bool,
    ) -> Result<Vec<CalendarObject>>;

    /// PUT `<calendar>/<uid>.ics`; fails if the resource already exists.
    async fn create_object(&self, calendar: &RemoteCalendar, uid: &str, ics: &str) -> Result<()>;

    /// Replace an existing object, conditional on its ETag.
    async fn replace_object(
        &self,
        calendar: &RemoteCalendar,
        object: &CalendarObject,
        ics: &str,
    ) -> Result<()>;

    async fn delete_object(&self, calendar: &RemoteCalendar, object: &CalendarObject)
    -> Result<()>;
}

/// Builds a fresh backend for every tool call.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ServerConfig) -> Result<Box<dyn CalDavBackend>>;
}
