//! Calendar resolution by display name or URL.

use anyhow::{Context, Result};

use crate::backend::{CalDavBackend, RemoteCalendar};

/// First calendar whose display name or URL equals `name_or_url` exactly.
///
/// Anything else is taken to be a calendar URL as given, unvalidated; a bad
/// URL surfaces as an error on the first request against it.
pub async fn resolve_calendar(
    backend: &dyn CalDavBackend,
    name_or_url: &str,
) -> Result<RemoteCalendar> {
    let calendars = backend
        .list_calendars()
        .await
        .context("Failed to list calendars")?;

    Ok(calendars
        .into_iter()
        .find(|c| c.name.as_deref() == Some(name_or_url) || c.url == name_or_url)
        .unwrap_or_else(|| RemoteCalendar::from_url(name_or_url)))
}
