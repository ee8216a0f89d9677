//! Core types for caltasks.
//!
//! - `Event` and `EventTime`, the records extracted from a calendar feed
//! - `ics` module for turning raw feed bytes into events
//! - `time` module for rendering event times as RFC 3339 timestamps

pub mod error;
pub mod event;
pub mod ics;
pub mod time;

pub use error::ParseError;
pub use event::*;
