//! Core types for schedulai.
//!
//! This module defines the fundamental types shared by the parser, the slot
//! calculator and the negotiator: time windows, extracted date/time pairs,
//! chat turns and the clock abstraction.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CalendarError;

/// A half-open `[start, end)` interval in the configured timezone.
///
/// Construction enforces `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

/// A window the calendar reports as occupied.
pub type BusyInterval = TimeWindow;

/// A window computed as free and long enough to book.
pub type OpenSlot = TimeWindow;

impl TimeWindow {
    /// Create a window, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, CalendarError> {
        if start >= end {
            return Err(CalendarError::InvalidTime(format!(
                "window start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Create a window of `length` beginning at `start`.
    pub fn starting_at(start: DateTime<Tz>, length: Duration) -> Result<Self, CalendarError> {
        Self::new(start, start + length)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        other.start < self.end && other.end > self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Date and time-of-day pulled out of a message; either may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedDateTime {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl ExtractedDateTime {
    pub fn new(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Self {
        Self { date, time }
    }

    /// Nothing recognized.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none()
    }

    /// Fill in whichever piece is missing from `other`.
    pub fn or(self, other: ExtractedDateTime) -> Self {
        Self {
            date: self.date.or(other.date),
            time: self.time.or(other.time),
        }
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current instant in `tz`.
    fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        self.now().with_timezone(&tz)
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze at a local wall-clock time in `tz`.
    pub fn at(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<Self> {
        localize(tz, date, time).map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Attach `tz` to a wall-clock date and time.
///
/// Ambiguous local times resolve to the earlier instant; times that do not
/// exist (DST gaps) yield `None`.
pub fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        localize(Kolkata, date, NaiveTime::from_hms_opt(h, m, 0).unwrap()).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted() {
        assert!(TimeWindow::new(at(10, 0), at(9, 0)).is_err());
        assert!(TimeWindow::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn test_window_overlap_is_half_open() {
        let a = TimeWindow::new(at(9, 0), at(10, 0)).unwrap();
        let b = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        let c = TimeWindow::new(at(9, 30), at(10, 30)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_extracted_merge() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 15);
        let time = NaiveTime::from_hms_opt(15, 0, 0);
        let merged = ExtractedDateTime::new(date, None).or(ExtractedDateTime::new(None, time));
        assert_eq!(merged, ExtractedDateTime::new(date, time));
        assert!(ExtractedDateTime::none().is_empty());
    }

    #[test]
    fn test_fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let clock = FixedClock::at(Kolkata, date, NaiveTime::from_hms_opt(10, 0, 0).unwrap()).unwrap();
        let now = clock.now_in(Kolkata);
        assert_eq!(now.date_naive(), date);
        assert_eq!(now.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }
}
