//! Natural-language date and time extraction.
//!
//! The parser turns free text ("tomorrow at 3pm", "15th of June at 11:30",
//! "friday afternoon at 4") into an [`ExtractedDateTime`]. It tries an ordered
//! list of strategies and returns the first one that recognizes a date:
//!
//! ```text
//! text ──▶ relative phrase ──▶ weekday ──▶ generic search ──▶ explicit date
//!             │ hit               │ hit        │ hit               │ hit
//!             ▼                   ▼            ▼                   ▼
//!        date + time-of-day parsed from the remaining text
//!
//! no strategy hit ──▶ (None, time-of-day of the whole text)
//! ```
//!
//! Each strategy is a pure [`DateStrategy`]; they never see each other's
//! output and there is no backtracking once one of them matches.
//!
//! Time ranges used for bookings ("2 to 4pm") live in [`range`].

use chrono::NaiveDate;
use std::ops::Range;

use crate::types::ExtractedDateTime;

pub mod explicit;
pub mod range;
pub mod relative;
pub mod search;
pub mod time_of_day;
pub mod weekday;

pub use explicit::ExplicitDatePatterns;
pub use range::{parse_time_range, TimeRange};
pub use relative::RelativePhrases;
pub use search::GenericDateSearch;
pub use time_of_day::parse_time_of_day;
pub use weekday::WeekdayLookup;

/// Month alternation shared by the date patterns.
pub(crate) const MONTH_PATTERN: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

/// One way of recognizing a date in lower-cased text.
pub trait DateStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the date (and any time-of-day) this strategy recognizes, or
    /// `None` to let the next strategy try.
    fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedDateTime>;
}

/// Ordered composition of date strategies with first-success semantics.
pub struct TimePhraseParser {
    strategies: Vec<Box<dyn DateStrategy>>,
}

impl TimePhraseParser {
    /// Create a parser with the default strategy order.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(RelativePhrases),
                Box::new(WeekdayLookup),
                Box::new(GenericDateSearch),
                Box::new(ExplicitDatePatterns),
            ],
        }
    }

    /// Create a parser with a custom strategy list.
    pub fn with_strategies(strategies: Vec<Box<dyn DateStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the configured strategies, in evaluation order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract a date and/or time-of-day from `text`, relative to `today`.
    ///
    /// Never fails: unrecognized input yields an empty result.
    pub fn parse(&self, text: &str, today: NaiveDate) -> ExtractedDateTime {
        let normalized = text.to_lowercase();

        for strategy in &self.strategies {
            if let Some(found) = strategy.extract(&normalized, today) {
                tracing::debug!(
                    strategy = strategy.name(),
                    date = ?found.date,
                    time = ?found.time,
                    "date strategy matched"
                );
                return found;
            }
        }

        ExtractedDateTime::new(None, parse_time_of_day(&normalized))
    }
}

impl Default for TimePhraseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Blank out `span` so the rest of the text can be searched for a time.
pub(crate) fn without_span(text: &str, span: Range<usize>) -> String {
    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..span.start]);
    rest.push(' ');
    rest.push_str(&text[span.end..]);
    rest
}

/// Month number for a (possibly abbreviated) English month name.
pub(crate) fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.trim().chars().take(3).collect();
    let month = match prefix.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Interpret a year token; two-digit years land in the 2000s.
pub(crate) fn expand_year(token: &str) -> Option<i32> {
    let year: i32 = token.parse().ok()?;
    match token.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn today() -> NaiveDate {
        // A Monday.
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_tomorrow_at_3pm_phrasings() {
        let parser = TimePhraseParser::new();
        let tomorrow = Some(today() + Duration::days(1));

        for text in [
            "tomorrow at 3pm",
            "Tomorrow at 3 PM",
            "3pm tomorrow",
            "tomorrow 15:00",
            "tomorrow at 3:00 pm",
            "Book a meeting tomorrow at 3pm please",
        ] {
            let found = parser.parse(text, today());
            assert_eq!(found.date, tomorrow, "date for {:?}", text);
            assert_eq!(found.time, hm(15, 0), "time for {:?}", text);
        }
    }

    #[test]
    fn test_strategy_order() {
        let parser = TimePhraseParser::new();
        assert_eq!(
            parser.strategy_names(),
            vec!["relative", "weekday", "search", "explicit"]
        );
    }

    #[test]
    fn test_relative_beats_weekday() {
        // Both "tomorrow" and "friday" appear; the relative table runs first.
        let found = TimePhraseParser::new().parse("tomorrow or friday", today());
        assert_eq!(found.date, Some(today() + Duration::days(1)));
    }

    #[test]
    fn test_explicit_date_with_time() {
        let found = TimePhraseParser::new().parse("15th of June at 11:30", today());
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 15));
        assert_eq!(found.time, hm(11, 30));
    }

    #[test]
    fn test_time_only() {
        let found = TimePhraseParser::new().parse("how about 4:30 pm?", today());
        assert_eq!(found.date, None);
        assert_eq!(found.time, hm(16, 30));
    }

    #[test]
    fn test_nothing_recognized() {
        let found = TimePhraseParser::new().parse("hello there", today());
        assert!(found.is_empty());
    }

    #[test]
    fn test_custom_strategies() {
        let parser = TimePhraseParser::with_strategies(vec![Box::new(WeekdayLookup)]);
        let found = parser.parse("tomorrow at 3pm", today());
        assert_eq!(found.date, None);
        assert_eq!(found.time, hm(15, 0));
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("June"), Some(6));
        assert_eq!(month_number("sept"), Some(9));
        assert_eq!(month_number("dec"), Some(12));
        assert_eq!(month_number("noon"), None);
    }

    #[test]
    fn test_expand_year() {
        assert_eq!(expand_year("26"), Some(2026));
        assert_eq!(expand_year("2027"), Some(2027));
        assert_eq!(expand_year("202"), None);
    }
}
