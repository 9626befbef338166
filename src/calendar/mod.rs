//! Calendar collaborator.
//!
//! The negotiator talks to calendars only through [`CalendarProvider`].
//! [`GoogleCalendar`] speaks the Google Calendar v3 REST API; the
//! [`InMemoryCalendar`] serves offline runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::types::{localize, BusyInterval, TimeWindow};

pub mod google;
pub mod memory;
pub mod token;

pub use google::GoogleCalendar;
pub use memory::InMemoryCalendar;
pub use token::{RefreshingToken, StaticToken, TokenSource};

/// Start or end of an event: all-day events carry only a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl EventTime {
    /// This instant in `tz`; a bare date maps to its local midnight.
    pub fn to_zoned(&self, tz: Tz) -> Option<DateTime<Tz>> {
        match self {
            EventTime::Date(date) => localize(tz, *date, NaiveTime::MIN),
            EventTime::DateTime(dt) => Some(dt.with_timezone(&tz)),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

/// An event as reported by a calendar provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub html_link: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl CalendarEvent {
    /// Title for display; untitled events get a placeholder.
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("(no title)")
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// The interval this event occupies in `tz`, if it is a valid one.
    pub fn window(&self, tz: Tz) -> Option<TimeWindow> {
        TimeWindow::new(self.start.to_zoned(tz)?, self.end.to_zoned(tz)?).ok()
    }
}

/// Sort events chronologically, all-day events first within a day.
pub fn sort_events(events: &mut [CalendarEvent], tz: Tz) {
    events.sort_by_key(|event| (event.start.to_zoned(tz), !event.is_all_day()));
}

/// Busy intervals covered by `events`.
pub fn busy_from_events(events: &[CalendarEvent], tz: Tz) -> Vec<BusyInterval> {
    let mut busy: Vec<BusyInterval> = events.iter().filter_map(|e| e.window(tz)).collect();
    busy.sort_by_key(|w| w.start());
    busy
}

/// Remote calendar operations the negotiator depends on.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Provider name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Events intersecting `window`, ordered by start time.
    async fn list_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Busy intervals intersecting `window`, ordered by start time.
    async fn free_busy(&self, window: &TimeWindow) -> Result<Vec<BusyInterval>, CalendarError>;

    /// Create an event and return its link.
    async fn insert_event(&self, window: &TimeWindow, summary: &str)
        -> Result<String, CalendarError>;

    /// Delete an event by id.
    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError>;
}
