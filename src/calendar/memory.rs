//! In-process calendar for offline runs and tests.

use async_trait::async_trait;
use chrono_tz::Tz;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{busy_from_events, sort_events, CalendarEvent, CalendarProvider, EventTime};
use crate::error::CalendarError;
use crate::types::{BusyInterval, TimeWindow};

/// Calendar kept entirely in memory.
///
/// [`InMemoryCalendar::fail_with`] makes every call return the given error
/// until [`InMemoryCalendar::recover`] is called.
pub struct InMemoryCalendar {
    timezone: Tz,
    events: RwLock<Vec<CalendarEvent>>,
    outage: RwLock<Option<CalendarError>>,
}

impl InMemoryCalendar {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            events: RwLock::new(Vec::new()),
            outage: RwLock::new(None),
        }
    }

    /// Add an event directly, bypassing the outage switch. Returns its id.
    pub async fn add_event(&self, window: &TimeWindow, summary: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let event = CalendarEvent {
            id: id.clone(),
            summary: Some(summary.to_string()),
            start: EventTime::DateTime(window.start().fixed_offset()),
            end: EventTime::DateTime(window.end().fixed_offset()),
            html_link: Some(link_for(&id)),
            location: None,
            description: None,
        };
        self.events.write().await.push(event);
        id
    }

    /// Add a fully specified event, e.g. an all-day one.
    pub async fn add_raw_event(&self, event: CalendarEvent) {
        self.events.write().await.push(event);
    }

    /// Snapshot of every stored event.
    pub async fn events(&self) -> Vec<CalendarEvent> {
        self.events.read().await.clone()
    }

    /// Make every subsequent call fail with `error`.
    pub async fn fail_with(&self, error: CalendarError) {
        *self.outage.write().await = Some(error);
    }

    pub async fn recover(&self) {
        *self.outage.write().await = None;
    }

    async fn check_outage(&self) -> Result<(), CalendarError> {
        match self.outage.read().await.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn overlapping(&self, window: &TimeWindow) -> Vec<CalendarEvent> {
        let mut found: Vec<CalendarEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| {
                event
                    .window(self.timezone)
                    .map_or(false, |w| w.overlaps(window))
            })
            .cloned()
            .collect();
        sort_events(&mut found, self.timezone);
        found
    }
}

fn link_for(id: &str) -> String {
    format!("memory://events/{}", id)
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.check_outage().await?;
        Ok(self.overlapping(window).await)
    }

    async fn free_busy(&self, window: &TimeWindow) -> Result<Vec<BusyInterval>, CalendarError> {
        self.check_outage().await?;
        let events = self.overlapping(window).await;
        Ok(busy_from_events(&events, self.timezone))
    }

    async fn insert_event(
        &self,
        window: &TimeWindow,
        summary: &str,
    ) -> Result<String, CalendarError> {
        self.check_outage().await?;
        let id = self.add_event(window, summary).await;
        Ok(link_for(&id))
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        self.check_outage().await?;
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.id != event_id);
        if events.len() == before {
            return Err(CalendarError::NotFound(event_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::localize;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::Asia::Kolkata;

    fn window(start: u32, end: u32) -> TimeWindow {
        let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let at = |h| localize(Kolkata, date, NaiveTime::from_hms_opt(h, 0, 0).unwrap()).unwrap();
        TimeWindow::new(at(start), at(end)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_list_delete() {
        let calendar = InMemoryCalendar::new(Kolkata);
        let link = calendar.insert_event(&window(14, 15), "Sync").await.unwrap();
        calendar.add_event(&window(10, 11), "Standup").await;
        assert!(link.starts_with("memory://events/"));

        let events = calendar.list_events(&window(9, 18)).await.unwrap();
        let titles: Vec<&str> = events.iter().map(|e| e.title()).collect();
        assert_eq!(titles, vec!["Standup", "Sync"]);

        calendar.delete_event(&events[0].id).await.unwrap();
        assert_eq!(calendar.events().await.len(), 1);
        assert!(matches!(
            calendar.delete_event("missing").await,
            Err(CalendarError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_free_busy_only_overlapping() {
        let calendar = InMemoryCalendar::new(Kolkata);
        calendar.add_event(&window(7, 8), "Early").await;
        calendar.add_event(&window(12, 13), "Lunch").await;

        let busy = calendar.free_busy(&window(9, 18)).await.unwrap();
        assert_eq!(busy, vec![window(12, 13)]);
    }

    #[tokio::test]
    async fn test_outage() {
        let calendar = InMemoryCalendar::new(Kolkata);
        calendar.fail_with(CalendarError::Timeout).await;
        assert_eq!(
            calendar.free_busy(&window(9, 18)).await,
            Err(CalendarError::Timeout)
        );
        calendar.recover().await;
        assert!(calendar.free_busy(&window(9, 18)).await.is_ok());
    }
}
