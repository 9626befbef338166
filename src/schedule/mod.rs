//! Working hours and free/busy slot computation.
//!
//! [`ScheduleRules`] carries the timezone and durations the rest of the
//! system works in. The algorithms in [`slots`] are pure functions over
//! [`TimeWindow`]s.

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::error::CalendarError;
use crate::types::{localize, TimeWindow};

pub mod slots;

pub use slots::{available_slots, is_window_free, suggest_available_slots};

/// The daily window in which meetings may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `time` falls inside the working day (`start <= time < end`).
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    /// The working window on `date` in `tz`.
    pub fn window_on(&self, date: NaiveDate, tz: Tz) -> Result<TimeWindow, CalendarError> {
        let start = localize(tz, date, self.start).ok_or_else(|| {
            CalendarError::InvalidTime(format!("{} {} does not exist in {}", date, self.start, tz))
        })?;
        let end = localize(tz, date, self.end).ok_or_else(|| {
            CalendarError::InvalidTime(format!("{} {} does not exist in {}", date, self.end, tz))
        })?;
        TimeWindow::new(start, end)
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Timezone, working hours and durations used for every scheduling decision.
#[derive(Debug, Clone)]
pub struct ScheduleRules {
    pub timezone: Tz,
    pub hours: WorkingHours,
    /// Shortest free window worth offering.
    pub min_slot: Duration,
    /// Stride of the fixed-step suggestion mode.
    pub suggestion_step: Duration,
    /// Length of a meeting booked from a single start time in chat.
    pub meeting_length: Duration,
    /// Length of a meeting booked through the direct booking endpoint.
    pub direct_booking_length: Duration,
    pub default_summary: String,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            hours: WorkingHours::default(),
            min_slot: Duration::minutes(30),
            suggestion_step: Duration::minutes(30),
            meeting_length: Duration::hours(1),
            direct_booking_length: Duration::minutes(30),
            default_summary: "Meeting".to_string(),
        }
    }
}

impl ScheduleRules {
    /// The working window on `date`.
    pub fn working_window(&self, date: NaiveDate) -> Result<TimeWindow, CalendarError> {
        self.hours.window_on(date, self.timezone)
    }

    /// The whole calendar day `[00:00, next 00:00)` for `date`.
    pub fn day_window(&self, date: NaiveDate) -> Result<TimeWindow, CalendarError> {
        let invalid = || CalendarError::InvalidTime(format!("{} has no start of day in {}", date, self.timezone));
        let start = localize(self.timezone, date, NaiveTime::MIN).ok_or_else(invalid)?;
        let next = date.succ_opt().ok_or_else(invalid)?;
        let end = localize(self.timezone, next, NaiveTime::MIN).ok_or_else(invalid)?;
        TimeWindow::new(start, end)
    }

    /// A window of `length` starting at `time` on `date`.
    pub fn window_at(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        length: Duration,
    ) -> Result<TimeWindow, CalendarError> {
        let start = localize(self.timezone, date, time).ok_or_else(|| {
            CalendarError::InvalidTime(format!("{} {} does not exist in {}", date, time, self.timezone))
        })?;
        TimeWindow::starting_at(start, length)
    }
}
