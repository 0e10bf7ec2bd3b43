//! iCloud CalDAV backend and tool handlers.
//!
//! Every tool call goes through [`commands::dispatch`], which connects a
//! fresh [`CalDavBackend`] through a [`Connector`] and runs one handler.

pub mod backend;
pub mod caldav;
pub mod commands;
pub mod icloud;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod resolver;

pub use backend::{CalDavBackend, CalendarObject, Connector, RemoteCalendar};
pub use commands::dispatch;
pub use icloud::ICloudConnector;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBackend;
