//! Error types for icloud-caldav.

use thiserror::Error;

/// Errors raised by the shared core (configuration, parsing).
///
/// Remote failures are not modelled here: they travel as `anyhow` errors
/// from the provider up to the tool boundary.
#[derive(Error, Debug)]
pub enum CalDavError {
    #[error("Missing required env var: {0}")]
    MissingEnv(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid ISO datetime '{0}'")]
    InvalidTimestamp(String),

    #[error("Time window of ±{0} days is out of range")]
    WindowOutOfRange(i64),

    #[error("ICS parse error: {0}")]
    IcsParse(String),
}

/// Result type alias for core operations.
pub type CalDavResult<T> = Result<T, CalDavError>;
