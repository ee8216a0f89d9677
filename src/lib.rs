//! caltasks: copy the events of an iCalendar feed into a new Google Tasks list.
//!
//! The run is a straight line: fetch the feed, extract its events, obtain a
//! token, create a task list and insert one task per event.

pub mod config;
pub mod credentials;
pub mod error;
pub mod feed;
pub mod google;
pub mod pipeline;
pub mod tasks;
pub mod writer;

pub use error::{ApiError, Error, Result};
