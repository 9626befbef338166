//! Time-of-day recognition.

use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// "3:30 pm", "11:05am"
    static ref HOUR_MINUTE_MERIDIEM: Regex =
        Regex::new(r"\b(0?[1-9]|1[0-2]):([0-5][0-9])\s*([ap])\.?m\.?").expect("valid regex");
    /// "3 pm", "3 p.m."
    static ref HOUR_SPACE_MERIDIEM: Regex =
        Regex::new(r"\b(0?[1-9]|1[0-2])\s+([ap])\.?m\b").expect("valid regex");
    /// "14:00", "9:15"
    static ref HOUR_MINUTE_24: Regex =
        Regex::new(r"\b([01]?[0-9]|2[0-3]):([0-5][0-9])\b").expect("valid regex");
    /// "3pm", "11am"
    static ref HOUR_MERIDIEM: Regex =
        Regex::new(r"\b(0?[1-9]|1[0-2])([ap])\.?m\b").expect("valid regex");
    /// A bare hour: "at 3"
    static ref BARE_HOUR: Regex = Regex::new(r"\b([01]?[0-9]|2[0-3])\b").expect("valid regex");
}

type Converter = fn(&Captures<'_>) -> Option<NaiveTime>;

/// Extract a time-of-day from lower-cased text.
///
/// Patterns are tried in a fixed order; the first one that yields a valid
/// time wins. A bare number is read as a 24-hour clock hour.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let patterns: [(&Regex, Converter); 5] = [
        (&*HOUR_MINUTE_MERIDIEM, |c: &Captures<'_>| {
            let hour = to_24_hour(num(c, 1)?, meridiem(c, 3)?);
            NaiveTime::from_hms_opt(hour, num(c, 2)?, 0)
        }),
        (&*HOUR_SPACE_MERIDIEM, |c: &Captures<'_>| {
            NaiveTime::from_hms_opt(to_24_hour(num(c, 1)?, meridiem(c, 2)?), 0, 0)
        }),
        (&*HOUR_MINUTE_24, |c: &Captures<'_>| NaiveTime::from_hms_opt(num(c, 1)?, num(c, 2)?, 0)),
        (&*HOUR_MERIDIEM, |c: &Captures<'_>| {
            NaiveTime::from_hms_opt(to_24_hour(num(c, 1)?, meridiem(c, 2)?), 0, 0)
        }),
        (&*BARE_HOUR, |c: &Captures<'_>| NaiveTime::from_hms_opt(num(c, 1)?, 0, 0)),
    ];

    patterns
        .iter()
        .find_map(|(re, convert)| re.captures(text).and_then(|c| convert(&c)))
}

/// Convert a 12-hour clock hour to 24-hour form.
pub(crate) fn to_24_hour(hour: u32, meridiem: char) -> u32 {
    match (meridiem, hour) {
        ('a', 12) => 0,
        ('a', h) => h,
        ('p', 12) => 12,
        (_, h) => h + 12,
    }
}

fn num(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

fn meridiem(caps: &Captures<'_>, idx: usize) -> Option<char> {
    caps.get(idx)?.as_str().chars().next()
}
