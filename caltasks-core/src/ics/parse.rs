//! VEVENT extraction using the icalendar crate's parser.

use super::vtimezone::ZoneDefinitions;
use crate::error::ParseError;
use crate::event::{Event, EventTime};
use crate::time::{resolve_zone, with_offset};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

/// Parse a raw feed into events, one per VEVENT, in document order.
///
/// A document without any VEVENT yields an empty list.
pub fn extract_events(raw: &[u8]) -> Result<Vec<Event>, ParseError> {
    let content = std::str::from_utf8(raw).map_err(|_| ParseError::NotUtf8)?;
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let is_calendar = content
        .get(..15)
        .is_some_and(|head| head.eq_ignore_ascii_case("BEGIN:VCALENDAR"));
    if !is_calendar {
        return Err(ParseError::NotACalendar);
    }

    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let zones = ZoneDefinitions::from_components(&calendar.components);

    let mut events = Vec::new();
    collect_events(&calendar.components, &zones, &mut events);
    Ok(events)
}

/// Walk the component tree depth-first, so events nested under a
/// VCALENDAR wrapper are found the same as top-level ones.
fn collect_events(
    components: &[Component<'_>],
    zones: &ZoneDefinitions,
    events: &mut Vec<Event>,
) {
    for component in components {
        if component.name == "VEVENT" {
            events.push(read_event(component, zones));
        }
        collect_events(&component.components, zones, events);
    }
}

fn read_event(vevent: &Component<'_>, zones: &ZoneDefinitions) -> Event {
    Event {
        summary: text_prop(vevent, "SUMMARY"),
        start: time_prop(vevent, "DTSTART", zones),
        end: time_prop(vevent, "DTEND", zones),
        location: text_prop(vevent, "LOCATION"),
        description: text_prop(vevent, "DESCRIPTION"),
    }
}

/// Empty values count as missing.
fn text_prop(vevent: &Component<'_>, name: &str) -> Option<String> {
    vevent
        .find_prop(name)
        .map(|p| p.val.as_ref().to_string())
        .filter(|s| !s.is_empty())
}

/// Values the parser cannot read as a date or date-time count as missing.
fn time_prop(
    vevent: &Component<'_>,
    name: &str,
    zones: &ZoneDefinitions,
) -> Option<EventTime> {
    vevent
        .find_prop(name)
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|dpt| to_event_time(dpt, zones))
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info.
///
/// A TZID no zone database knows is resolved against the document's own
/// VTIMEZONE definitions.
fn to_event_time(dpt: DatePerhapsTime, zones: &ZoneDefinitions) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let defined = resolve_zone(&tzid)
                    .is_none()
                    .then(|| zones.offset_at(&tzid, &date_time))
                    .flatten();

                match defined {
                    Some(offset) => EventTime::DateTimeOffset(with_offset(&date_time, offset)),
                    None => EventTime::DateTimeZoned {
                        datetime: date_time,
                        tzid,
                    },
                }
            }
        },
    }
}
