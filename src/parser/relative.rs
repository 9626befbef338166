//! Relative day phrases: "today", "tomorrow", "next week", ...

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use super::{parse_time_of_day, without_span, DateStrategy};
use crate::types::ExtractedDateTime;

#[derive(Debug, Clone, Copy)]
enum Offset {
    Days(i64),
    NextMonth,
    NextYear,
}

lazy_static! {
    /// Longest phrases first so "day after tomorrow" is not read as "tomorrow".
    static ref PHRASES: Vec<(Regex, Offset)> = [
        (r"\bday after tomorrow\b", Offset::Days(2)),
        (r"\btoday\b", Offset::Days(0)),
        (r"\btomorrow\b", Offset::Days(1)),
        (r"\bnext week\b", Offset::Days(7)),
        (r"\bnext month\b", Offset::NextMonth),
        (r"\bnext year\b", Offset::NextYear),
    ]
    .into_iter()
    .map(|(pattern, offset)| (Regex::new(pattern).expect("valid regex"), offset))
    .collect();
}

/// Looks up a fixed table of relative day phrases.
///
/// "next month" and "next year" resolve to the first day of that period.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativePhrases;

impl DateStrategy for RelativePhrases {
    fn name(&self) -> &'static str {
        "relative"
    }

    fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedDateTime> {
        PHRASES.iter().find_map(|(re, offset)| {
            let found = re.find(text)?;
            let date = resolve(*offset, today)?;
            let rest = without_span(text, found.range());
            Some(ExtractedDateTime::new(Some(date), parse_time_of_day(&rest)))
        })
    }
}

fn resolve(offset: Offset, today: NaiveDate) -> Option<NaiveDate> {
    match offset {
        Offset::Days(days) => Some(today + Duration::days(days)),
        Offset::NextMonth => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        Offset::NextYear => NaiveDate::from_ymd_opt(today.year() + 1, 1, 1),
    }
}
