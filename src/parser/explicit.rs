//! Explicit calendar dates: "15th June", "June 15, 2026", "15-06-2026".

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::ops::Range;

use super::{expand_year, month_number, parse_time_of_day, without_span, DateStrategy, MONTH_PATTERN};
use crate::types::ExtractedDateTime;

lazy_static! {
    /// "15 june", "15th of june", "3rd july 2026"
    static ref DAY_MONTH: Regex = Regex::new(&format!(
        r"\b(0?[1-9]|[12][0-9]|3[01])(?:st|nd|rd|th)?[\s-]*(?:of[\s-]+)?({})\b(?:,?[\s-]+(\d{{4}})\b)?",
        MONTH_PATTERN
    ))
    .expect("valid regex");
    /// "june 15", "june 15th, 2026"
    static ref MONTH_DAY: Regex = Regex::new(&format!(
        r"\b({})\.?[\s-]*(0?[1-9]|[12][0-9]|3[01])(?:st|nd|rd|th)?\b(?:,?[\s-]+(\d{{4}})\b)?",
        MONTH_PATTERN
    ))
    .expect("valid regex");
    /// "15-06-2026", "15/6/26", "15 06 2026"
    static ref NUMERIC: Regex = Regex::new(
        r"\b(0?[1-9]|[12][0-9]|3[01])[\s/-](0?[1-9]|1[0-2])[\s/-](\d{4}|\d{2})\b"
    )
    .expect("valid regex");
}

/// Day, month and optional year as read from the text.
struct DateParts {
    day: u32,
    month: u32,
    year: Option<i32>,
}

/// Regex patterns for dates that name the month explicitly.
///
/// A date without a year that already passed this year is moved to the
/// next year. Today does not count as passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitDatePatterns;

impl DateStrategy for ExplicitDatePatterns {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedDateTime> {
        let patterns: [(&Regex, fn(&Captures<'_>) -> Option<DateParts>); 3] = [
            (&*DAY_MONTH, |c: &Captures<'_>| {
                Some(DateParts {
                    day: c[1].parse().ok()?,
                    month: month_number(&c[2])?,
                    year: c.get(3).and_then(|y| expand_year(y.as_str())),
                })
            }),
            (&*MONTH_DAY, |c: &Captures<'_>| {
                Some(DateParts {
                    day: c[2].parse().ok()?,
                    month: month_number(&c[1])?,
                    year: c.get(3).and_then(|y| expand_year(y.as_str())),
                })
            }),
            (&*NUMERIC, |c: &Captures<'_>| {
                Some(DateParts {
                    day: c[1].parse().ok()?,
                    month: c[2].parse().ok()?,
                    year: Some(expand_year(&c[3])?),
                })
            }),
        ];

        let (date, span) = patterns.iter().find_map(|(re, read)| {
            re.captures_iter(text).find_map(|caps| {
                let parts = read(&caps)?;
                Some((resolve(parts, today)?, caps.get(0)?.range()))
            })
        })?;

        let rest = without_span(text, span);
        Some(ExtractedDateTime::new(Some(date), parse_time_of_day(&rest)))
    }
}

fn resolve(parts: DateParts, today: NaiveDate) -> Option<NaiveDate> {
    match parts.year {
        Some(year) => NaiveDate::from_ymd_opt(year, parts.month, parts.day),
        None => {
            let date = NaiveDate::from_ymd_opt(today.year(), parts.month, parts.day)?;
            if date < today {
                NaiveDate::from_ymd_opt(today.year() + 1, parts.month, parts.day)
            } else {
                Some(date)
            }
        }
    }
}

/// The matched span of the first explicit date in `text`, if any.
pub(crate) fn find_explicit_date(text: &str) -> Option<Range<usize>> {
    [&*DAY_MONTH, &*MONTH_DAY, &*NUMERIC]
        .iter()
        .find_map(|re| re.find(text).map(|m| m.range()))
}
