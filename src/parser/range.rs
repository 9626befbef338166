//! Time ranges: "2 to 4pm", "between 10am and 12pm", "14:00-15:30".

use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::explicit::find_explicit_date;
use super::time_of_day::to_24_hour;
use super::without_span;

lazy_static! {
    static ref TIME_RANGE: Regex = Regex::new(
        r"(?:\b(between)\s+)?\b(\d{1,2})(?::(\d{2}))?(?:\s*([ap])\.?m\.?)?(?:\s*[-–]\s*|\s+(to|until|till|through|thru|and)\s+)(\d{1,2})(?::(\d{2}))?(?:\s*([ap])\.?m\b\.?)?"
    )
    .expect("valid regex");
}

/// Start and end times of a requested range.
///
/// An end before the start means the range runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

/// Find the first time range in `text`.
///
/// An unmarked start hour borrows the end's "pm" when that keeps it before
/// the end ("2 to 4pm" is 14:00 to 16:00, "11 to 1pm" stays 11:00 to 13:00).
/// "and" only joins a range introduced by "between".
pub fn parse_time_range(text: &str) -> Option<TimeRange> {
    let lowered = text.to_lowercase();
    // Keep "15-06-2026" from reading as 15:00 to 06:00.
    let scan = match find_explicit_date(&lowered) {
        Some(span) => without_span(&lowered, span),
        None => lowered,
    };

    TIME_RANGE.captures_iter(&scan).find_map(|caps| {
        let whole = caps.get(0)?;
        if touches_date_separator(&scan, whole.start(), whole.end()) {
            return None;
        }
        if caps.get(5).map(|c| c.as_str()) == Some("and") && caps.get(1).is_none() {
            return None;
        }
        normalize(&caps)
    })
}

fn touches_date_separator(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    matches!(before, Some('-' | '/')) || matches!(after, Some('-' | '/' | ':' | '0'..='9'))
}

fn normalize(caps: &Captures<'_>) -> Option<TimeRange> {
    let start_hour: u32 = caps.get(2)?.as_str().parse().ok()?;
    let start_minute: u32 = minutes(caps.get(3))?;
    let start_meridiem = meridiem(caps.get(4));
    let end_hour: u32 = caps.get(6)?.as_str().parse().ok()?;
    let end_minute: u32 = minutes(caps.get(7))?;
    let end_meridiem = meridiem(caps.get(8));

    let end_hour = clock_hour(end_hour, end_meridiem)?;
    let start_hour = match (start_meridiem, end_meridiem) {
        (Some(_), _) => clock_hour(start_hour, start_meridiem)?,
        (None, Some('p')) if start_hour < 12 && start_hour + 12 <= end_hour => start_hour + 12,
        (None, Some('a')) if start_hour == 12 => 0,
        (None, _) => clock_hour(start_hour, None)?,
    };

    let start = NaiveTime::from_hms_opt(start_hour, start_minute, 0)?;
    let end = NaiveTime::from_hms_opt(end_hour, end_minute, 0)?;
    if start == end {
        return None;
    }
    Some(TimeRange { start, end })
}

/// Validate an hour and apply its meridiem, if any.
fn clock_hour(hour: u32, meridiem: Option<char>) -> Option<u32> {
    match meridiem {
        Some(m) if (1..=12).contains(&hour) => Some(to_24_hour(hour, m)),
        Some(_) => None,
        None if hour <= 23 => Some(hour),
        None => None,
    }
}

fn minutes(m: Option<regex::Match<'_>>) -> Option<u32> {
    match m {
        Some(m) => m.as_str().parse().ok().filter(|v| *v <= 59),
        None => Some(0),
    }
}

fn meridiem(m: Option<regex::Match<'_>>) -> Option<char> {
    m.and_then(|m| m.as_str().chars().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(text: &str) -> Option<(NaiveTime, NaiveTime)> {
        parse_time_range(text).map(|r| (r.start, r.end))
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_start_borrows_pm() {
        assert_eq!(range("2 to 4pm"), Some((hm(14, 0), hm(16, 0))));
        assert_eq!(range("book tomorrow 2-4 pm"), Some((hm(14, 0), hm(16, 0))));
    }

    #[test]
    fn test_start_keeps_morning_when_borrowing_would_invert() {
        assert_eq!(range("11 to 1pm"), Some((hm(11, 0), hm(13, 0))));
    }

    #[test]
    fn test_explicit_meridiems() {
        assert_eq!(range("10am to 12pm"), Some((hm(10, 0), hm(12, 0))));
        assert_eq!(range("between 9:30 am and 11 am"), Some((hm(9, 30), hm(11, 0))));
        assert_eq!(range("12am to 2am"), Some((hm(0, 0), hm(2, 0))));
    }

    #[test]
    fn test_twenty_four_hour() {
        assert_eq!(range("14:00-15:30"), Some((hm(14, 0), hm(15, 30))));
        assert_eq!(range("from 9 until 17"), Some((hm(9, 0), hm(17, 0))));
    }

    #[test]
    fn test_crossing_midnight() {
        let r = parse_time_range("10pm to 2am").unwrap();
        assert_eq!((r.start, r.end), (hm(22, 0), hm(2, 0)));
        assert!(r.crosses_midnight());
        assert!(!parse_time_range("2 to 4pm").unwrap().crosses_midnight());
    }

    #[test]
    fn test_and_requires_between() {
        assert_eq!(range("me and 3 others"), None);
        assert_eq!(range("2 and 4pm"), None);
    }

    #[test]
    fn test_dates_are_not_ranges() {
        assert_eq!(range("15-06-2026"), None);
        assert_eq!(range("2026-06-15"), None);
        assert_eq!(range("on 15-06-2026 from 10 to 11am"), Some((hm(10, 0), hm(11, 0))));
    }

    #[test]
    fn test_invalid_hours_rejected() {
        assert_eq!(range("25 to 26"), None);
        assert_eq!(range("13pm to 2pm"), None);
        assert_eq!(range("3 to 3"), None);
        assert_eq!(range("tomorrow at 3pm"), None);
    }
}
