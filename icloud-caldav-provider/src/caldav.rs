//! CalDAV client helpers for iCloud using libdav.
//!
//! Provides utilities for creating libdav CalDav clients with iCloud authentication.

use anyhow::{Context, Result};
use http::{Method, Uri};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use libdav::CalDavClient;
use libdav::dav::WebDavClient;
use libdav::requests::{DavRequest, ParseResponseError, PreparedRequest};
use tower::ServiceBuilder;
use tower_http::{auth::AddAuthorization, follow_redirect::FollowRedirect};

use crate::backend::CalendarObject;

/// Type alias for the HTTP client with auth and redirect following.
type HttpClient = FollowRedirect<
    AddAuthorization<
        Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, String>,
    >,
>;

/// Type alias for our CalDAV client.
pub type ICloudCalDavClient = CalDavClient<HttpClient>;

/// Create a libdav CalDavClient configured for iCloud.
///
/// The client is configured with:
/// - Basic authentication using the provided credentials
/// - Automatic redirect following (iCloud redirects to user-specific servers)
/// - HTTPS support
pub fn create_caldav_client(
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<ICloudCalDavClient> {
    let uri: Uri = base_url
        .parse()
        .with_context(|| format!("Invalid base URL: {}", base_url))?;

    let https_connector = HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_or_http()
        .enable_http1()
        .build();

    let http_client = Client::builder(TokioExecutor::new()).build(https_connector);

    let auth_client = AddAuthorization::basic(http_client, username, password);

    // iCloud redirects to pXX-caldav.icloud.com
    let client = ServiceBuilder::new()
        .layer(tower_http::follow_redirect::FollowRedirectLayer::new())
        .service(auth_client);

    let webdav = WebDavClient::new(uri, client);
    Ok(CalDavClient::new(webdav))
}

/// Build the URL for an event resource.
pub fn event_url(calendar_url: &str, event_uid: &str) -> String {
    let base = calendar_url.trim_end_matches('/');
    format!("{}/{}.ics", base, event_uid)
}

/// Extract the href path from a full URL.
///
/// Converts "https://pXX-caldav.icloud.com/123/calendars/abc/" to "/123/calendars/abc/"
pub fn url_to_href(url: &str) -> String {
    if let Ok(uri) = url.parse::<Uri>() {
        uri.path().to_string()
    } else {
        url.to_string()
    }
}

/// Make an href absolute against the scheme and authority of `base`.
pub fn absolute_url(base: &Uri, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match (base.scheme_str(), base.authority()) {
        (Some(scheme), Some(authority)) => format!("{}://{}{}", scheme, authority, href),
        _ => href.to_string(),
    }
}

/// Last non-empty path segment of a calendar URL, e.g. the collection id.
pub fn last_path_segment(url: &str) -> Option<String> {
    let path = url_to_href(url);
    path.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map(|s| s.to_string())
}

// ============================================================================
// Custom CalDAV request for time-range filtered calendar queries
// ============================================================================

/// calendar-query REPORT with a time-range filter and optional server-side
/// recurrence expansion.
///
/// With expansion the server returns every occurrence inside the window as
/// its own VEVENT (RECURRENCE-ID set, times in UTC).
pub struct CalendarQuery<'a> {
    collection_href: &'a str,
    start: &'a str,
    end: &'a str,
    expand: bool,
}

impl<'a> CalendarQuery<'a> {
    /// `start` and `end` must be in CalDAV format: `YYYYMMDDTHHMMSSZ`
    pub fn new(collection_href: &'a str, start: &'a str, end: &'a str) -> Self {
        Self {
            collection_href,
            start,
            end,
            expand: false,
        }
    }

    pub fn expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    fn body(&self) -> String {
        let calendar_data = if self.expand {
            format!(
                r#"<C:calendar-data>
            <C:expand start="{}" end="{}"/>
        </C:calendar-data>"#,
                self.start, self.end
            )
        } else {
            "<C:calendar-data/>".to_string()
        };

        format!(
            r#"<C:calendar-query xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <prop>
        <getetag/>
        {}
    </prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR">
            <C:comp-filter name="VEVENT">
                <C:time-range start="{}" end="{}"/>
            </C:comp-filter>
        </C:comp-filter>
    </C:filter>
</C:calendar-query>"#,
            calendar_data, self.start, self.end
        )
    }
}

/// Response from a [`CalendarQuery`] request.
#[derive(Debug)]
pub struct CalendarQueryResponse {
    pub objects: Vec<CalendarObject>,
}

impl DavRequest for CalendarQuery<'_> {
    type Response = CalendarQueryResponse;
    type ParseError = ParseResponseError;
    type Error<E> = libdav::dav::WebDavError<E>;

    fn prepare_request(&self) -> std::result::Result<PreparedRequest, http::Error> {
        Ok(PreparedRequest {
            method: Method::from_bytes(b"REPORT")?,
            path: self.collection_href.to_string(),
            body: self.body(),
            headers: vec![("Depth".to_string(), "1".to_string())],
        })
    }

    fn parse_response(
        &self,
        parts: &http::response::Parts,
        body: &[u8],
    ) -> std::result::Result<Self::Response, ParseResponseError> {
        if !parts.status.is_success() {
            return Err(ParseResponseError::BadStatusCode(parts.status));
        }

        let objects = parse_calendar_objects(body)?;
        Ok(CalendarQueryResponse { objects })
    }
}

/// Parse calendar objects from a CalDAV multistatus response.
fn parse_calendar_objects(body: &[u8]) -> std::result::Result<Vec<CalendarObject>, ParseResponseError> {
    let text = std::str::from_utf8(body)?;
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let mut objects = Vec::new();

    for response in root.descendants().filter(|n| n.tag_name().name() == "response") {
        let href = response
            .descendants()
            .find(|n| n.tag_name().name() == "href")
            .and_then(|n| n.text())
            .map(|s| s.trim().to_string());

        let Some(href) = href else { continue };

        let etag = response
            .descendants()
            .find(|n| n.tag_name().name() == "getetag")
            .and_then(|n| n.text())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let data = response
            .descendants()
            .find(|n| n.tag_name().name() == "calendar-data")
            .and_then(|n| n.text())
            .map(|s| s.to_string());

        // Only include resources that have calendar data
        if let Some(data) = data {
            objects.push(CalendarObject { href, etag, data });
        }
    }

    Ok(objects)
}
