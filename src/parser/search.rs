//! Generic date search for forms the fixed tables do not cover.
//!
//! Recognized, in order: ISO dates ("2026-06-20"), offsets ("in 3 days",
//! "in two weeks"), day-of-month ordinals ("the 20th") and day-first numeric
//! dates without a year ("20/6"). Dates without a year never land in the past.

use chrono::{Datelike, Duration, Months, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

use super::{parse_time_of_day, without_span, DateStrategy, MONTH_PATTERN};
use crate::types::ExtractedDateTime;

lazy_static! {
    static ref ISO_DATE: Regex =
        Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid regex");
    static ref IN_OFFSET: Regex = Regex::new(
        r"\bin\s+(\d{1,3}|an?|one|two|three|four|five|six|seven|eight|nine|ten)\s+(day|week|month)s?\b"
    )
    .expect("valid regex");
    static ref ORDINAL: Regex =
        Regex::new(r"\bthe\s+(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex");
    static ref FOLLOWED_BY_MONTH: Regex =
        Regex::new(&format!(r"^\s*(?:of\s+)?(?:{})\b", MONTH_PATTERN)).expect("valid regex");
    static ref DAY_SLASH_MONTH: Regex =
        Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("valid regex");
}

/// Searches for loosely formatted dates anywhere in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDateSearch;

impl DateStrategy for GenericDateSearch {
    fn name(&self) -> &'static str {
        "search"
    }

    fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedDateTime> {
        let (date, span) = iso_date(text)
            .or_else(|| in_offset(text, today))
            .or_else(|| ordinal_day(text, today))
            .or_else(|| day_slash_month(text, today))?;

        let rest = without_span(text, span);
        Some(ExtractedDateTime::new(Some(date), parse_time_of_day(&rest)))
    }
}

fn iso_date(text: &str) -> Option<(NaiveDate, Range<usize>)> {
    let caps = ISO_DATE.captures(text)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    Some((date, caps.get(0)?.range()))
}

fn in_offset(text: &str, today: NaiveDate) -> Option<(NaiveDate, Range<usize>)> {
    let caps = IN_OFFSET.captures(text)?;
    let count = count_word(&caps[1])?;
    let date = match &caps[2] {
        "day" => today.checked_add_signed(Duration::days(count as i64))?,
        "week" => today.checked_add_signed(Duration::weeks(count as i64))?,
        _ => today.checked_add_months(Months::new(count))?,
    };
    Some((date, caps.get(0)?.range()))
}

fn ordinal_day(text: &str, today: NaiveDate) -> Option<(NaiveDate, Range<usize>)> {
    ORDINAL.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        // "the 20th of june" belongs to the explicit month patterns.
        if FOLLOWED_BY_MONTH.is_match(&text[whole.end()..]) {
            return None;
        }
        let day: u32 = caps[1].parse().ok()?;
        Some((next_day_of_month(today, day)?, whole.range()))
    })
}

fn day_slash_month(text: &str, today: NaiveDate) -> Option<(NaiveDate, Range<usize>)> {
    DAY_SLASH_MONTH.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        // Full numeric dates ("20/6/2026") are left to the explicit patterns.
        if text[whole.end()..].starts_with('/') || text[..whole.start()].ends_with('/') {
            return None;
        }
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        let date = if this_year < today {
            NaiveDate::from_ymd_opt(today.year() + 1, month, day)?
        } else {
            this_year
        };
        Some((date, whole.range()))
    })
}

/// The next date on or after `today` whose day-of-month is `day`.
fn next_day_of_month(today: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }
    let first = today.with_day(1)?;
    (0..12u32).find_map(|ahead| {
        let month_start = first.checked_add_months(Months::new(ahead))?;
        let candidate = month_start.with_day(day)?;
        (candidate >= today).then_some(candidate)
    })
}

fn count_word(word: &str) -> Option<u32> {
    let count = match word {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits.parse().ok()?,
    };
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 6, 15)
    }

    fn found_date(text: &str) -> Option<NaiveDate> {
        GenericDateSearch.extract(text, today()).and_then(|f| f.date)
    }

    #[test]
    fn test_iso_date() {
        let found = GenericDateSearch.extract("on 2026-07-01 at 14:30", today()).unwrap();
        assert_eq!(found.date, Some(date(2026, 7, 1)));
        assert_eq!(found.time, NaiveTime::from_hms_opt(14, 30, 0));
    }

    #[test]
    fn test_in_offsets() {
        assert_eq!(found_date("in 3 days"), Some(date(2026, 6, 18)));
        assert_eq!(found_date("in two weeks"), Some(date(2026, 6, 29)));
        assert_eq!(found_date("in a month"), Some(date(2026, 7, 15)));
    }

    #[test]
    fn test_ordinal_rolls_forward() {
        assert_eq!(found_date("the 20th"), Some(date(2026, 6, 20)));
        assert_eq!(found_date("the 15th"), Some(date(2026, 6, 15)));
        assert_eq!(found_date("the 3rd"), Some(date(2026, 7, 3)));
        // June has no 31st.
        assert_eq!(found_date("the 31st"), Some(date(2026, 7, 31)));
    }

    #[test]
    fn test_ordinal_with_month_is_skipped() {
        assert_eq!(found_date("the 20th of june"), None);
        assert_eq!(found_date("the 20th july"), None);
    }

    #[test]
    fn test_day_slash_month() {
        assert_eq!(found_date("on 20/6"), Some(date(2026, 6, 20)));
        assert_eq!(found_date("on 1/2"), Some(date(2027, 2, 1)));
        assert_eq!(found_date("on 20/6/2026"), None);
        assert_eq!(found_date("on 31/2"), None);
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(found_date("book a meeting"), None);
    }
}
