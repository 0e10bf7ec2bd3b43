//! In-memory [`CalDavBackend`] for tests.
//!
//! Keeps calendars and their objects behind a shared mutex so a clone handed
//! to the code under test and the clone kept by the test see the same data.
//! Like a server that ignores `<C:expand>`, objects come back as stored; a
//! recurring master matches every window that ends after its first start.
//! Objects it cannot parse are returned by every query.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use icloud_caldav_core::ics::first_event;
use icloud_caldav_core::{ServerConfig, TimeWindow};

use crate::backend::{CalDavBackend, CalendarObject, Connector, RemoteCalendar};
use crate::caldav::event_url;

#[derive(Debug)]
struct MemoryCalendar {
    calendar: RemoteCalendar,
    objects: Vec<CalendarObject>,
}

#[derive(Debug, Default)]
struct MemoryState {
    calendars: Vec<MemoryCalendar>,
    remote_calls: usize,
    next_etag: u64,
}

impl MemoryState {
    fn calendar_mut(&mut self, url: &str) -> Result<&mut MemoryCalendar> {
        self.calendars
            .iter_mut()
            .find(|c| c.calendar.url == url)
            .ok_or_else(|| anyhow!("404 Not Found: no calendar at {url}"))
    }

    fn fresh_etag(&mut self) -> String {
        self.next_etag += 1;
        format!("\"etag-{}\"", self.next_etag)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calendar; listing order is insertion order.
    pub fn with_calendar(self, name: Option<&str>, url: &str) -> Self {
        self.lock().calendars.push(MemoryCalendar {
            calendar: RemoteCalendar::new(name.map(str::to_string), url),
            objects: Vec::new(),
        });
        self
    }

    /// Store a raw object under `<calendar>/<name>.ics`, bypassing the call counter.
    pub fn insert_object(&self, calendar_url: &str, name: &str, data: &str) -> Result<()> {
        let mut state = self.lock();
        let etag = state.fresh_etag();
        let calendar = state.calendar_mut(calendar_url)?;
        calendar.objects.push(CalendarObject {
            href: event_url(calendar_url, name),
            etag: Some(etag),
            data: data.to_string(),
        });
        Ok(())
    }

    pub fn objects(&self, calendar_url: &str) -> Vec<CalendarObject> {
        self.lock()
            .calendar_mut(calendar_url)
            .map(|c| c.objects.clone())
            .unwrap_or_default()
    }

    /// Number of backend operations performed so far.
    pub fn remote_calls(&self) -> usize {
        self.lock().remote_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn call(&self) -> MutexGuard<'_, MemoryState> {
        let mut state = self.lock();
        state.remote_calls += 1;
        state
    }
}

/// Whether the first VEVENT of `data` may have an occurrence in the window.
fn overlaps(data: &str, window: &TimeWindow) -> bool {
    let Some(event) = first_event(data) else {
        return true;
    };
    let Some(start) = event.start.as_ref().map(|s| s.to_utc()) else {
        return true;
    };

    if event.is_recurring_master() {
        return start < window.end;
    }
    window.overlaps(start, event.end.map(|e| e.to_utc()))
}

impl Connector for MemoryBackend {
    fn connect(&self, _config: &ServerConfig) -> Result<Box<dyn CalDavBackend>> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl CalDavBackend for MemoryBackend {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        Ok(self
            .call()
            .calendars
            .iter()
            .map(|c| c.calendar.clone())
            .collect())
    }

    async fn query_objects(
        &self,
        calendar: &RemoteCalendar,
        window: &TimeWindow,
        _expand: bool,
    ) -> Result<Vec<CalendarObject>> {
        let mut state = self.call();
        let stored = state.calendar_mut(&calendar.url)?;
        Ok(stored
            .objects
            .iter()
            .filter(|o| overlaps(&o.data, window))
            .cloned()
            .collect())
    }

    async fn create_object(&self, calendar: &RemoteCalendar, uid: &str, ics: &str) -> Result<()> {
        let mut state = self.call();
        let etag = state.fresh_etag();
        let href = event_url(&calendar.url, uid);
        let stored = state.calendar_mut(&calendar.url)?;
        if stored.objects.iter().any(|o| o.href == href) {
            bail!("412 Precondition Failed: {href} already exists");
        }
        stored.objects.push(CalendarObject {
            href,
            etag: Some(etag),
            data: ics.to_string(),
        });
        Ok(())
    }

    async fn replace_object(
        &self,
        calendar: &RemoteCalendar,
        object: &CalendarObject,
        ics: &str,
    ) -> Result<()> {
        let mut state = self.call();
        let etag = state.fresh_etag();
        let stored = state.calendar_mut(&calendar.url)?;
        let existing = stored
            .objects
            .iter_mut()
            .find(|o| o.href == object.href)
            .ok_or_else(|| anyhow!("404 Not Found: {}", object.href))?;
        if existing.etag != object.etag {
            bail!("412 Precondition Failed: etag mismatch for {}", object.href);
        }
        existing.data = ics.to_string();
        existing.etag = Some(etag);
        Ok(())
    }

    async fn delete_object(
        &self,
        calendar: &RemoteCalendar,
        object: &CalendarObject,
    ) -> Result<()> {
        let mut state = self.call();
        let stored = state.calendar_mut(&calendar.url)?;
        let before = stored.objects.len();
        stored.objects.retain(|o| o.href != object.href);
        if stored.objects.len() == before {
            bail!("404 Not Found: {}", object.href);
        }
        Ok(())
    }
}
