//! Weekday names resolved to their next occurrence.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

use super::{parse_time_of_day, without_span, DateStrategy};
use crate::types::ExtractedDateTime;

lazy_static! {
    static ref WEEKDAY: Regex = Regex::new(
        r"\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b"
    )
    .expect("valid regex");
}

/// Resolves the first weekday name in the text to its next occurrence.
///
/// A bare weekday that names today resolves to today. With a leading
/// "next" it resolves a week out instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayLookup;

impl DateStrategy for WeekdayLookup {
    fn name(&self) -> &'static str {
        "weekday"
    }

    fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedDateTime> {
        let caps = WEEKDAY.captures(text)?;
        let whole = caps.get(0)?;
        let target: Weekday = caps.get(2)?.as_str().parse().ok()?;

        let mut offset = days_until(today.weekday(), target);
        if offset == 0 && caps.get(1).is_some() {
            offset = 7;
        }

        let date = today + Duration::days(offset);
        let rest = without_span(text, whole.range());
        Some(ExtractedDateTime::new(Some(date), parse_time_of_day(&rest)))
    }
}

/// Days from `from` forward to the next `to`, in `0..7`.
fn days_until(from: Weekday, to: Weekday) -> i64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    #[test]
    fn test_next_occurrence() {
        let found = WeekdayLookup.extract("wednesday at 5", monday()).unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 17));
        assert_eq!(found.time, NaiveTime::from_hms_opt(5, 0, 0));

        let found = WeekdayLookup.extract("sunday", monday()).unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 21));
    }

    #[test]
    fn test_same_weekday_is_today() {
        let found = WeekdayLookup.extract("monday 3pm", monday()).unwrap();
        assert_eq!(found.date, Some(monday()));
        assert_eq!(found.time, NaiveTime::from_hms_opt(15, 0, 0));
    }

    #[test]
    fn test_next_same_weekday_is_a_week_out() {
        let found = WeekdayLookup.extract("next monday", monday()).unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 22));

        let found = WeekdayLookup.extract("next friday", monday()).unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 19));
    }

    #[test]
    fn test_days_until_wraps() {
        assert_eq!(days_until(Weekday::Sat, Weekday::Mon), 2);
        assert_eq!(days_until(Weekday::Mon, Weekday::Sun), 6);
        assert_eq!(days_until(Weekday::Thu, Weekday::Thu), 0);
    }

    #[test]
    fn test_no_weekday() {
        assert!(WeekdayLookup.extract("mondays are rough", monday()).is_none());
    }
}
