//! Core types for icloud-caldav.
//!
//! This crate provides the pieces shared by the CalDAV provider and the
//! tool server:
//! - `config` for the environment-driven `ServerConfig`
//! - `protocol` for tool commands and their parameters
//! - `mcp` for the JSON-RPC frames of the tool-invocation endpoint
//! - `ics` for building and reading iCalendar text

pub mod config;
pub mod constants;
pub mod error;
pub mod ics;
pub mod mcp;
pub mod protocol;
pub mod records;
pub mod timestamp;
pub mod window;

pub use config::{Profile, ServerConfig};
pub use error::{CalDavError, CalDavResult};
pub use records::*;
pub use timestamp::Timestamp;
pub use window::TimeWindow;
