//! libdav-backed [`CalDavBackend`] for iCloud.
//!
//! Discovery flow:
//! 1. PROPFIND on `CALDAV_URL` for the current-user-principal
//! 2. PROPFIND on the principal for the calendar-home-set
//! 3. PROPFIND on each home for its calendar collections
//!
//! A missing principal or home set falls back to `CALDAV_URL` itself.

use anyhow::{Context, Result};
use async_trait::async_trait;
use http::Uri;
use icloud_caldav_core::{ServerConfig, TimeWindow};
use libdav::caldav::{FindCalendarHomeSet, FindCalendars};
use libdav::dav::{Delete, GetEtag, GetProperty, PutResource, mime_types};
use secrecy::{ExposeSecret, Secret};
use tracing::debug;

use crate::backend::{CalDavBackend, CalendarObject, Connector, RemoteCalendar};
use crate::caldav::{
    CalendarQuery, ICloudCalDavClient, absolute_url, create_caldav_client, event_url, url_to_href,
};

/// Connects to the CalDAV service named in the config.
#[derive(Debug, Clone, Copy, Default)]
pub struct ICloudConnector;

impl Connector for ICloudConnector {
    fn connect(&self, config: &ServerConfig) -> Result<Box<dyn CalDavBackend>> {
        Ok(Box::new(LibDavBackend::new(config)?))
    }
}

pub struct LibDavBackend {
    client: ICloudCalDavClient,
    apple_id: String,
    app_password: Secret<String>,
}

impl LibDavBackend {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = create_caldav_client(
            &config.caldav_url,
            &config.apple_id,
            config.app_password.expose_secret(),
        )?;

        Ok(LibDavBackend {
            client,
            apple_id: config.apple_id.clone(),
            app_password: config.app_password.clone(),
        })
    }

    /// Client rooted at a calendar's own host (iCloud shards users across servers).
    fn calendar_client(&self, calendar: &RemoteCalendar) -> Result<ICloudCalDavClient> {
        create_caldav_client(
            &calendar.url,
            &self.apple_id,
            self.app_password.expose_secret(),
        )
    }

    async fn calendar_homes(&self) -> Result<Vec<Uri>> {
        let principal = self
            .client
            .find_current_user_principal()
            .await
            .context("Failed to find current user principal. Check APPLE_ID and ICLOUD_APP_PASSWORD.")?;

        let Some(principal) = principal else {
            return Ok(vec![self.client.base_url().clone()]);
        };

        let response = self
            .client
            .request(FindCalendarHomeSet::new(&principal))
            .await
            .context("Failed to find calendar home set")?;

        if response.home_sets.is_empty() {
            Ok(vec![self.client.base_url().clone()])
        } else {
            Ok(response.home_sets)
        }
    }
}

/// Etag from the REPORT, or a fresh one from the server.
async fn current_etag(client: &ICloudCalDavClient, object: &CalendarObject) -> Result<String> {
    if let Some(etag) = &object.etag {
        return Ok(etag.clone());
    }
    let href = url_to_href(&object.href);
    let response = client
        .request(GetEtag::new(&href))
        .await
        .context("Failed to get event etag - event may not exist")?;
    Ok(response.etag)
}

#[async_trait]
impl CalDavBackend for LibDavBackend {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        let homes = self.calendar_homes().await?;
        let mut calendars = Vec::new();

        for home in &homes {
            let found = self
                .client
                .request(FindCalendars::new(home))
                .await
                .with_context(|| format!("Failed to list calendars under {}", home))?;

            for cal in found.calendars {
                let name = self
                    .client
                    .request(GetProperty::new(&cal.href, &libdav::names::DISPLAY_NAME))
                    .await
                    .ok()
                    .and_then(|r| r.value)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());

                // Home sets given as bare paths live on the base host.
                let root = if home.authority().is_some() {
                    home
                } else {
                    self.client.base_url()
                };
                calendars.push(RemoteCalendar::new(name, absolute_url(root, &cal.href)));
            }
        }

        debug!(count = calendars.len(), "listed calendars");
        Ok(calendars)
    }

    async fn query_objects(
        &self,
        calendar: &RemoteCalendar,
        window: &TimeWindow,
        expand: bool,
    ) -> Result<Vec<CalendarObject>> {
        let client = self.calendar_client(calendar)?;
        let href = url_to_href(&calendar.url);
        let start = window.start_caldav();
        let end = window.end_caldav();

        debug!(calendar = %calendar.url, %start, %end, expand, "calendar-query REPORT");

        let response = client
            .request(CalendarQuery::new(&href, &start, &end).expand(expand))
            .await
            .with_context(|| format!("Failed to query events in {}", calendar.url))?;

        Ok(response.objects)
    }

    async fn create_object(&self, calendar: &RemoteCalendar, uid: &str, ics: &str) -> Result<()> {
        let client = self.calendar_client(calendar)?;
        let href = url_to_href(&event_url(&calendar.url, uid));

        // PUT with If-None-Match: * (fails if exists)
        client
            .request(PutResource::new(&href).create(ics, mime_types::CALENDAR))
            .await
            .context("Failed to create event")?;

        Ok(())
    }

    async fn replace_object(
        &self,
        calendar: &RemoteCalendar,
        object: &CalendarObject,
        ics: &str,
    ) -> Result<()> {
        let client = self.calendar_client(calendar)?;
        let href = url_to_href(&object.href);
        let etag = current_etag(&client, object).await?;

        // PUT with If-Match
        client
            .request(PutResource::new(&href).update(ics, mime_types::CALENDAR, &etag))
            .await
            .context("Failed to update event")?;

        Ok(())
    }

    async fn delete_object(
        &self,
        calendar: &RemoteCalendar,
        object: &CalendarObject,
    ) -> Result<()> {
        let client = self.calendar_client(calendar)?;
        let href = url_to_href(&object.href);
        let etag = current_etag(&client, object).await?;

        client
            .request(Delete::new(&href).with_etag(&etag))
            .await
            .context("Failed to delete event")?;

        Ok(())
    }
}
