//! Error types for calendar extraction.

use thiserror::Error;

/// Errors that can occur while reading an iCalendar document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("ICS parse error: feed is not valid UTF-8")]
    NotUtf8,

    #[error("ICS parse error: document does not start with BEGIN:VCALENDAR")]
    NotACalendar,

    #[error("ICS parse error: {0}")]
    Malformed(String),
}
