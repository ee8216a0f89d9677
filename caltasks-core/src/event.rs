//! Event records extracted from a calendar feed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// A single VEVENT, reduced to the fields a task is built from.
///
/// Every field is optional: a property missing from the feed stays `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub summary: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A DTSTART/DTEND value, kept in the shape the feed used.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`)
    Date(NaiveDate),
    /// `...Z` timestamp
    DateTimeUtc(DateTime<Utc>),
    /// Local time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Local time whose offset came from a VTIMEZONE in the feed itself
    DateTimeOffset(DateTime<FixedOffset>),
    /// Local time in the zone named by the TZID parameter
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

