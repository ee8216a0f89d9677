//! iCalendar feed parsing.
//!
//! Reads a whole VCALENDAR document according to RFC 5545 and pulls out
//! every VEVENT it contains.

mod parse;
mod vtimezone;

pub use parse::extract_events;
