//! Process configuration, read once from the environment at startup.
//!
//! | Variable              | Default                      |
//! |-----------------------|------------------------------|
//! | `APPLE_ID`            | required                     |
//! | `ICLOUD_APP_PASSWORD` | required                     |
//! | `CALDAV_URL`          | `https://caldav.icloud.com`  |
//! | `TZID`                | `America/New_York`           |
//! | `HOST`                | `127.0.0.1`                  |
//! | `PORT`                | `8000`                       |
//! | `DR_PROFILE`          | `0` (`1` = read-only tools)  |
//! | `SCAN_DAYS`           | `1095`                       |

use std::fmt;

use chrono_tz::Tz;
use config::{Config, Environment};
use secrecy::Secret;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_CALDAV_URL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SCAN_DAYS, DEFAULT_TZID, MAX_SCAN_DAYS,
};
use crate::error::{CalDavError, CalDavResult};

/// Which tool set the server exposes. The two sets never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// list_calendars, list_events, create_event, update_event, delete_event
    Write,
    /// search, fetch
    ReadOnly,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Write => "write",
            Profile::ReadOnly => "read-only",
        }
    }
}

/// Raw settings as the `config` crate sees them: lowercased env var names.
#[derive(Debug, Default, Deserialize)]
struct Settings {
    apple_id: Option<String>,
    icloud_app_password: Option<String>,
    caldav_url: Option<String>,
    tzid: Option<String>,
    host: Option<String>,
    port: Option<String>,
    dr_profile: Option<String>,
    scan_days: Option<String>,
}

/// Validated server configuration, shared read-only by every handler.
#[derive(Clone)]
pub struct ServerConfig {
    pub apple_id: String,
    pub app_password: Secret<String>,
    pub caldav_url: String,
    pub default_tzid: String,
    pub host: String,
    pub port: u16,
    pub profile: Profile,
    pub scan_days: i64,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("apple_id", &self.apple_id)
            .field("app_password", &"[redacted]")
            .field("caldav_url", &self.caldav_url)
            .field("default_tzid", &self.default_tzid)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("profile", &self.profile)
            .field("scan_days", &self.scan_days)
            .finish()
    }
}

impl ServerConfig {
    /// Read the process environment.
    ///
    /// Callers wanting `.env` support load it (e.g. with `dotenvy`) first.
    pub fn from_env() -> CalDavResult<Self> {
        let config = Config::builder()
            .add_source(Environment::default())
            .build()
            .map_err(|e| CalDavError::Config(e.to_string()))?;

        Self::from_config(config)
    }

    /// Validate an already-built `config::Config`.
    pub fn from_config(config: Config) -> CalDavResult<Self> {
        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CalDavError::Config(e.to_string()))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Settings) -> CalDavResult<Self> {
        let apple_id = required(settings.apple_id, "APPLE_ID")?;
        let app_password = required(settings.icloud_app_password, "ICLOUD_APP_PASSWORD")?;
        let caldav_url = required(
            Some(settings.caldav_url.unwrap_or_else(|| DEFAULT_CALDAV_URL.to_string())),
            "CALDAV_URL",
        )?;

        let default_tzid = settings
            .tzid
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TZID.to_string());
        if default_tzid.parse::<Tz>().is_err() {
            tracing::warn!(tzid = %default_tzid, "TZID is not a known IANA zone; using it verbatim");
        }

        let host = settings
            .host
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match settings.port {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| CalDavError::Config(format!("PORT '{raw}' is not a valid port: {e}")))?,
            None => DEFAULT_PORT,
        };

        let profile = match settings.dr_profile.as_deref().map(str::trim) {
            Some("1") => Profile::ReadOnly,
            _ => Profile::Write,
        };

        let scan_days = match settings.scan_days {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
                CalDavError::Config(format!("SCAN_DAYS '{raw}' is not an integer: {e}"))
            })?,
            None => DEFAULT_SCAN_DAYS,
        };
        if !(1..=MAX_SCAN_DAYS).contains(&scan_days) {
            return Err(CalDavError::Config(format!(
                "SCAN_DAYS must be between 1 and {MAX_SCAN_DAYS}, got {scan_days}"
            )));
        }

        Ok(ServerConfig {
            apple_id,
            app_password: Secret::new(app_password),
            caldav_url,
            default_tzid,
            host,
            port,
            profile,
            scan_days,
        })
    }

    /// Socket address string to bind, `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The default timezone resolved through the tz database, if known.
    pub fn default_tz(&self) -> Option<Tz> {
        self.default_tzid.parse().ok()
    }
}

fn required(value: Option<String>, name: &'static str) -> CalDavResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(CalDavError::MissingEnv(name))
}
