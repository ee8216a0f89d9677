//! RFC 3339 rendering of event times.
//!
//! Values without a zone are taken to be UTC, bare dates become midnight UTC,
//! and zoned values keep the offset their zone had at that instant.

mod windows;

use crate::event::EventTime;
use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeZone,
};
use chrono_tz::Tz;
use std::fmt::Display;

const RFC3339_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Render an optional event time; `None` renders as an empty string.
pub fn normalize(time: Option<&EventTime>) -> String {
    time.map(to_rfc3339).unwrap_or_default()
}

/// Render an event time as `YYYY-MM-DDTHH:MM:SS±HH:MM`.
pub fn to_rfc3339(time: &EventTime) -> String {
    match time {
        EventTime::Date(date) => format_instant(&date.and_time(NaiveTime::MIN).and_utc()),
        EventTime::DateTimeUtc(dt) => format_instant(dt),
        EventTime::DateTimeFloating(naive) => format_instant(&naive.and_utc()),
        EventTime::DateTimeOffset(dt) => format_instant(dt),
        EventTime::DateTimeZoned { datetime, tzid } => match resolve_zone(tzid) {
            Some(tz) => format_instant(&localize(&tz, datetime)),
            None => format_instant(&datetime.and_utc()),
        },
    }
}

/// Look up a `TZID` as an IANA name, then as a Windows zone name.
pub fn resolve_zone(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim().trim_matches('"');

    tzid.parse::<Tz>()
        .ok()
        .or_else(|| windows::to_iana(tzid).and_then(|iana| iana.parse().ok()))
}

/// Attach a zone to a local time. Ambiguous times (DST fold) take the earlier
/// instant. Skipped times (DST gap) keep their wall clock and the offset in
/// effect just before the transition.
fn localize(tz: &Tz, local: &NaiveDateTime) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(local) {
        LocalResult::Single(dt) => dt.fixed_offset(),
        LocalResult::Ambiguous(earliest, _) => earliest.fixed_offset(),
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&(*local - Duration::days(1)))
                .fix();
            with_offset(local, before)
        }
    }
}

/// Read `local` as a wall-clock time at a fixed `offset`.
pub fn with_offset(local: &NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = *local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

fn format_instant<Z>(dt: &DateTime<Z>) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    dt.format(RFC3339_FORMAT).to_string()
}
