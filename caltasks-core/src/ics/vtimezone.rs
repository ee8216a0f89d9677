//! UTC offsets from the VTIMEZONE blocks a feed carries.
//!
//! Only what Outlook, Exchange and Lotus style exports use is read: each
//! STANDARD/DAYLIGHT observance has a DTSTART, TZOFFSETFROM, TZOFFSETTO and
//! at most one yearly RRULE (BYMONTH with BYDAY and/or BYMONTHDAY).

use chrono::{Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Weekday};
use icalendar::parser::Component;
use std::collections::HashMap;

/// Every VTIMEZONE in a document, keyed by TZID.
#[derive(Debug, Default)]
pub struct ZoneDefinitions {
    zones: HashMap<String, Vec<Observance>>,
}

/// One STANDARD or DAYLIGHT block.
#[derive(Debug, Clone, PartialEq)]
struct Observance {
    start: NaiveDateTime,
    offset_from: FixedOffset,
    offset_to: FixedOffset,
    rule: Option<YearlyRule>,
}

#[derive(Debug, Clone, PartialEq)]
struct YearlyRule {
    month: Option<u32>,
    /// BYDAY: ordinal (0 when absent) and weekday
    weekday: Option<(i32, Weekday)>,
    month_days: Vec<u32>,
    until: Option<NaiveDateTime>,
}

impl ZoneDefinitions {
    /// Collect VTIMEZONE components anywhere under `components`.
    pub fn from_components(components: &[Component<'_>]) -> Self {
        let mut definitions = ZoneDefinitions::default();
        definitions.collect(components);
        definitions
    }

    fn collect(&mut self, components: &[Component<'_>]) {
        for component in components {
            if component.name == "VTIMEZONE" {
                let tzid = component.find_prop("TZID").map(|p| p.val.as_ref());
                let observances: Vec<_> = component
                    .components
                    .iter()
                    .filter(|c| c.name == "STANDARD" || c.name == "DAYLIGHT")
                    .filter_map(Observance::read)
                    .collect();

                if let Some(tzid) = tzid {
                    if !observances.is_empty() {
                        self.zones.insert(zone_key(tzid), observances);
                    }
                }
            }
            self.collect(&component.components);
        }
    }

    /// The offset `tzid` has at wall-clock time `local`, if the document
    /// defines that zone.
    ///
    /// Skipped wall-clock times keep the offset from before the jump and
    /// repeated ones take the earlier instant.
    pub fn offset_at(&self, tzid: &str, local: &NaiveDateTime) -> Option<FixedOffset> {
        let observances = self.zones.get(&zone_key(tzid))?;

        let latest = observances
            .iter()
            .flat_map(|o| {
                o.transitions_around(local.year())
                    .into_iter()
                    .map(move |at| (at, o))
            })
            .filter(|(at, _)| at <= local)
            .max_by_key(|(at, _)| *at);

        match latest {
            Some((_, observance)) => Some(observance.offset_to),
            // Before the first transition the zone is at its oldest "from" offset
            None => observances
                .iter()
                .min_by_key(|o| o.start)
                .map(|o| o.offset_from),
        }
    }
}

fn zone_key(tzid: &str) -> String {
    tzid.trim().trim_matches('"').to_string()
}

impl Observance {
    fn read(component: &Component<'_>) -> Option<Self> {
        let start = parse_local(component.find_prop("DTSTART")?.val.as_ref())?;
        let offset_from = parse_offset(component.find_prop("TZOFFSETFROM")?.val.as_ref())?;
        let offset_to = parse_offset(component.find_prop("TZOFFSETTO")?.val.as_ref())?;
        let rule = component
            .find_prop("RRULE")
            .and_then(|p| YearlyRule::parse(p.val.as_ref()));

        Some(Observance {
            start,
            offset_from,
            offset_to,
            rule,
        })
    }

    /// Wall-clock times, in the new offset, from which this observance
    /// applies, for `year - 1` and `year`.
    fn transitions_around(&self, year: i32) -> Vec<NaiveDateTime> {
        let onsets = match &self.rule {
            Some(rule) => [year - 1, year]
                .into_iter()
                .filter_map(|y| rule.onset(y, &self.start))
                .collect(),
            None => vec![self.start],
        };

        // A forward jump skips wall-clock time: it only takes hold after the gap
        let gap =
            i64::from(self.offset_to.local_minus_utc() - self.offset_from.local_minus_utc());
        onsets
            .into_iter()
            .map(|onset| onset + Duration::seconds(gap.max(0)))
            .collect()
    }
}

impl YearlyRule {
    fn parse(value: &str) -> Option<Self> {
        let mut rule = YearlyRule {
            month: None,
            weekday: None,
            month_days: Vec::new(),
            until: None,
        };

        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.to_ascii_uppercase().as_str() {
                "FREQ" if !val.eq_ignore_ascii_case("YEARLY") => return None,
                "BYMONTH" => rule.month = val.split(',').next()?.parse().ok(),
                "BYDAY" => rule.weekday = parse_by_day(val.split(',').next()?),
                "BYMONTHDAY" => {
                    rule.month_days = val.split(',').filter_map(|d| d.parse().ok()).collect();
                    rule.month_days.sort_unstable();
                }
                "UNTIL" => rule.until = parse_local(val),
                _ => {}
            }
        }

        Some(rule)
    }

    fn onset(&self, year: i32, start: &NaiveDateTime) -> Option<NaiveDateTime> {
        let month = self.month.unwrap_or_else(|| start.month());

        let date = match (self.weekday, self.month_days.as_slice()) {
            (Some((_, weekday)), days) if !days.is_empty() => days
                .iter()
                .filter_map(|d| NaiveDate::from_ymd_opt(year, month, *d))
                .find(|date| date.weekday() == weekday)?,
            (Some((0, weekday)), _) => nth_weekday(year, month, weekday, 1)?,
            (Some((n, weekday)), _) => nth_weekday(year, month, weekday, n)?,
            (None, [day, ..]) => NaiveDate::from_ymd_opt(year, month, *day)?,
            (None, []) => NaiveDate::from_ymd_opt(year, month, start.day())?,
        };

        let onset = date.and_time(start.time());
        let in_effect = onset >= *start && self.until.is_none_or(|until| onset <= until);
        in_effect.then_some(onset)
    }
}

/// `2SU`, `-1SU` or `SU`.
fn parse_by_day(value: &str) -> Option<(i32, Weekday)> {
    let split = value.len().checked_sub(2)?;
    let (ordinal, day) = value.split_at_checked(split)?;

    let weekday = match day.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };
    let ordinal = match ordinal {
        "" => 0,
        n => n.trim_start_matches('+').parse().ok()?,
    };

    Some((ordinal, weekday))
}

/// The `n`th `weekday` of a month, counting from the end when `n` is negative.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: i32) -> Option<NaiveDate> {
    if n > 0 {
        return NaiveDate::from_weekday_of_month_opt(year, month, weekday, u8::try_from(n).ok()?);
    }

    let last = NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    let date = last - Duration::days(i64::from(back)) - Duration::weeks(i64::from(-n - 1));

    (date.month() == month).then_some(date)
}

/// `19701101T020000`, with or without a trailing `Z`.
fn parse_local(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S").ok()
}

/// `-0800`, `+0530` or `+053000`.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, digits) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    if !matches!(digits.len(), 4 | 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[0..2].parse().ok()?;
    let minutes: i32 = digits[2..4].parse().ok()?;
    let seconds: i32 = digits.get(4..6).map_or(Ok(0), str::parse).ok()?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalendar::parser::{read_calendar, unfold};

    const OUTLOOK_PACIFIC: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:Microsoft Exchange Server 2010\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Pacific Time (US & Canada)\r\n\
BEGIN:STANDARD\r\n\
DTSTART:16010101T020000\r\n\
TZOFFSETFROM:-0700\r\n\
TZOFFSETTO:-0800\r\n\
RRULE:FREQ=YEARLY;INTERVAL=1;BYDAY=1SU;BYMONTH=11\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:16010101T020000\r\n\
TZOFFSETFROM:-0800\r\n\
TZOFFSETTO:-0700\r\n\
RRULE:FREQ=YEARLY;INTERVAL=1;BYDAY=2SU;BYMONTH=3\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:India\r\n\
BEGIN:STANDARD\r\n\
DTSTART:16010101T000000\r\n\
TZOFFSETFROM:+0530\r\n\
TZOFFSETTO:+0530\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Central Europe\r\n\
BEGIN:STANDARD\r\n\
DTSTART:16011028T030000\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
RRULE:FREQ=YEARLY;BYDAY=-1SU;BYMONTH=10\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:16010325T020000\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
RRULE:FREQ=YEARLY;BYDAY=-1SU;BYMONTH=3\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
END:VCALENDAR\r\n";

    fn definitions() -> ZoneDefinitions {
        let unfolded = unfold(OUTLOOK_PACIFIC);
        let calendar = read_calendar(&unfolded).expect("Should parse");
        ZoneDefinitions::from_components(&calendar.components)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn hours(h: i32) -> FixedOffset {
        FixedOffset::east_opt(h * 3600).unwrap()
    }

    #[test]
    fn test_standard_and_daylight_offsets() {
        let zones = definitions();
        let tz = "Pacific Time (US & Canada)";

        assert_eq!(zones.offset_at(tz, &at(2024, 1, 5, 10, 0)), Some(hours(-8)));
        assert_eq!(zones.offset_at(tz, &at(2024, 7, 1, 10, 0)), Some(hours(-7)));
        assert_eq!(zones.offset_at(tz, &at(2024, 12, 24, 18, 0)), Some(hours(-8)));
    }

    #[test]
    fn test_gap_and_fold_match_zone_database_rules() {
        let zones = definitions();
        let tz = "Pacific Time (US & Canada)";

        // 2024-03-10 02:30 is skipped; 2024-11-03 01:30 happens twice
        assert_eq!(zones.offset_at(tz, &at(2024, 3, 10, 2, 30)), Some(hours(-8)));
        assert_eq!(zones.offset_at(tz, &at(2024, 3, 10, 3, 0)), Some(hours(-7)));
        assert_eq!(zones.offset_at(tz, &at(2024, 11, 3, 1, 30)), Some(hours(-7)));
        assert_eq!(zones.offset_at(tz, &at(2024, 11, 3, 2, 0)), Some(hours(-8)));
    }

    #[test]
    fn test_last_weekday_rules() {
        let zones = definitions();

        // Last Sunday of March 2024 is the 31st
        assert_eq!(
            zones.offset_at("Central Europe", &at(2024, 3, 30, 12, 0)),
            Some(hours(1))
        );
        assert_eq!(
            zones.offset_at("Central Europe", &at(2024, 3, 31, 12, 0)),
            Some(hours(2))
        );
    }

    #[test]
    fn test_fixed_zone_without_rule() {
        let zones = definitions();
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();

        assert_eq!(zones.offset_at("India", &at(2024, 6, 1, 9, 0)), Some(ist));
        assert_eq!(zones.offset_at("\"India\"", &at(2024, 6, 1, 9, 0)), Some(ist));
    }

    #[test]
    fn test_unknown_zone_is_none() {
        assert_eq!(definitions().offset_at("Mars", &at(2024, 1, 1, 0, 0)), None);
        assert_eq!(
            ZoneDefinitions::default().offset_at("India", &at(2024, 1, 1, 0, 0)),
            None
        );
    }

    #[test]
    fn test_nth_weekday() {
        assert_eq!(
            nth_weekday(2024, 3, Weekday::Sun, 2),
            NaiveDate::from_ymd_opt(2024, 3, 10)
        );
        assert_eq!(
            nth_weekday(2024, 10, Weekday::Sun, -1),
            NaiveDate::from_ymd_opt(2024, 10, 27)
        );
        assert_eq!(nth_weekday(2024, 2, Weekday::Fri, 5), None);
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("-0800"), Some(hours(-8)));
        assert_eq!(
            parse_offset("+053000"),
            FixedOffset::east_opt(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_offset("0800"), None);
        assert_eq!(parse_offset("+8"), None);
    }
}
