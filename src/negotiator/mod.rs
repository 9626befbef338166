//! Availability and booking negotiation.
//!
//! The negotiator turns a classified message into calendar calls and a
//! reply. Conversation state is passed in by the caller; nothing here is
//! shared between sessions.
//!
//! ```text
//!   Idle ──date only──▶ SlotsOffered ──"2"──▶ booked ──▶ Idle
//!    │                     │
//!    │                     └──"wednesday at 5"──▶ reclassified
//!    │
//!    └──cancel, several matches──▶ CancellationPending ──"1" / title──▶ deleted ──▶ Idle
//! ```
//!
//! Collaborator failures are returned as typed errors; rendering them is the
//! gateway's job.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

pub mod render;

use crate::calendar::{sort_events, CalendarEvent, CalendarProvider};
use crate::error::{CalendarError, LlmError, Result};
use crate::gateway::intent::{Classification, Intent, IntentClassifier};
use crate::gateway::session::{ConversationState, Pending};
use crate::llm::{conversation_prompt, LanguageModel, LlmDateExtractor};
use crate::parser::{parse_time_range, TimePhraseParser, TimeRange};
use crate::schedule::{available_slots, is_window_free, suggest_available_slots, ScheduleRules};
use crate::types::{localize, Clock, OpenSlot, SystemClock, TimeWindow};

/// Drives every conversation flow against one calendar.
pub struct Negotiator {
    calendar: Arc<dyn CalendarProvider>,
    model: Arc<dyn LanguageModel>,
    parser: Arc<TimePhraseParser>,
    extractor: LlmDateExtractor,
    classifier: IntentClassifier,
    rules: ScheduleRules,
    clock: Arc<dyn Clock>,
}

impl Negotiator {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        model: Arc<dyn LanguageModel>,
        rules: ScheduleRules,
    ) -> Self {
        let parser = Arc::new(TimePhraseParser::new());
        let extractor = LlmDateExtractor::new(model.clone(), parser.clone());
        Self {
            calendar,
            model,
            parser,
            extractor,
            classifier: IntentClassifier::new(),
            rules,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Read cancellation dates with the parser only.
    pub fn without_model_extraction(mut self) -> Self {
        self.extractor = LlmDateExtractor::new(self.model.clone(), self.parser.clone()).parser_only();
        self
    }

    pub fn rules(&self) -> &ScheduleRules {
        &self.rules
    }

    pub fn parser(&self) -> &TimePhraseParser {
        &self.parser
    }

    pub fn calendar_name(&self) -> &str {
        self.calendar.name()
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The current instant in the configured timezone.
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now_in(self.rules.timezone)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Answer one message, updating `state`.
    pub async fn respond(&self, state: &mut ConversationState, message: &str) -> Result<String> {
        let classification = self.classifier.classify_in_context(message, &state.pending);
        debug!(?classification, "message classified");

        match classification {
            Classification::ConfirmSlot(choice) => self.confirm_slot(state, choice).await,
            Classification::InvalidSelection => {
                let offered = match &state.pending {
                    Pending::SlotsOffered { slots, .. } => slots.len(),
                    _ => 0,
                };
                Ok(render::invalid_selection(offered))
            }
            Classification::ConfirmCancellation(choice) => {
                self.confirm_cancellation(state, choice).await
            }
            Classification::CancelReprompt => {
                let candidates = match &state.pending {
                    Pending::CancellationPending { events, .. } => events.len(),
                    _ => 0,
                };
                Ok(render::cancel_reprompt(candidates))
            }
            Classification::Fresh(intent) => {
                if state.pending != Pending::Idle {
                    info!(%intent, "pending negotiation abandoned");
                }
                state.clear_pending();
                state.last_intent = Some(intent);
                match intent {
                    Intent::CheckAvailability => self.check_availability(state, message).await,
                    Intent::Book => self.book_meeting(state, message).await,
                    Intent::Cancel => self.cancel_meeting(state, message).await,
                    Intent::ViewCalendar => self.view_calendar(message).await,
                    Intent::General => self.general(state, message).await,
                }
            }
        }
    }

    /// Yes/no for a time or range; open slots for a bare date.
    pub async fn check_availability(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<String> {
        let parsed = self.parser.parse(message, self.today());
        let Some(date) = parsed.date else {
            return Ok(render::ask_availability_date());
        };

        if let Some(range) = parse_time_range(message) {
            let window = self.range_window(date, range)?;
            return Ok(if self.is_free(&window).await? {
                render::range_free(&window)
            } else {
                render::conflict(&window)
            });
        }

        if let Some(time) = parsed.time {
            if !self.rules.hours.contains(time) {
                return Ok(render::outside_hours(&self.rules.hours));
            }
            let window = self.rules.window_at(date, time, self.rules.meeting_length)?;
            return Ok(if self.is_free(&window).await? {
                render::available_at(&window)
            } else {
                render::unavailable_at(&window)
            });
        }

        self.offer_slots(state, date).await
    }

    /// Book a range or a single start time; a bare date offers slots.
    pub async fn book_meeting(&self, state: &mut ConversationState, message: &str) -> Result<String> {
        let parsed = self.parser.parse(message, self.today());

        if let Some(range) = parse_time_range(message) {
            let Some(date) = parsed.date else {
                return Ok(render::ask_range_date());
            };
            let window = self.range_window(date, range)?;
            return self.book_window(&window).await;
        }

        let Some(date) = parsed.date else {
            return Ok(render::ask_booking_date());
        };
        let Some(time) = parsed.time else {
            return self.offer_slots(state, date).await;
        };
        let window = self.rules.window_at(date, time, self.rules.meeting_length)?;
        self.book_window(&window).await
    }

    /// Cancel the day's only meeting, or list the candidates.
    pub async fn cancel_meeting(&self, state: &mut ConversationState, message: &str) -> Result<String> {
        let now = self.now();
        let date = self
            .extractor
            .extract(message, now)
            .await
            .date
            .unwrap_or_else(|| now.date_naive());

        let events = self.events_on(date).await?;
        match events.as_slice() {
            [] => Ok(render::nothing_to_cancel(date)),
            [event] => {
                self.calendar.delete_event(&event.id).await?;
                info!(event_id = %event.id, %date, "meeting cancelled");
                Ok(render::cancelled(event, date))
            }
            _ => {
                info!(%date, count = events.len(), "cancellation needs a choice");
                let reply = render::cancel_choices(date, &events, self.rules.timezone);
                state.await_cancellation(date, events);
                Ok(reply)
            }
        }
    }

    pub async fn view_calendar(&self, message: &str) -> Result<String> {
        let Some(date) = self.parser.parse(message, self.today()).date else {
            return Ok(render::ask_view_date());
        };
        let events = self.events_on(date).await?;
        Ok(if events.is_empty() {
            render::empty_day(date)
        } else {
            render::agenda(date, &events, self.rules.timezone)
        })
    }

    /// Free-form reply from the language model.
    pub async fn general(&self, state: &ConversationState, message: &str) -> Result<String> {
        let prompt = conversation_prompt(&state.history(), message, self.now());
        match self.model.complete(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => Ok(reply.trim().to_string()),
            Ok(_) | Err(LlmError::NotConfigured) => Ok(render::capabilities()),
            Err(e) => Err(e.into()),
        }
    }

    /// Book a fixed-length meeting at `time` without negotiation.
    pub async fn book_direct(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        summary: Option<&str>,
    ) -> Result<String> {
        let window = self.rules.window_at(date, time, self.rules.direct_booking_length)?;
        let summary = summary
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.rules.default_summary);
        let link = self.calendar.insert_event(&window, summary).await?;
        info!(%window, summary, "direct booking created");
        Ok(link)
    }

    /// Bookable fixed-length candidates within working hours on `date`.
    pub async fn suggest_slots(&self, date: NaiveDate) -> Result<Vec<OpenSlot>> {
        let window = self.rules.working_window(date)?;
        let busy = self.calendar.free_busy(&window).await?;
        Ok(suggest_available_slots(
            window,
            &busy,
            self.rules.direct_booking_length,
            self.rules.suggestion_step,
        ))
    }

    /// The day's events in chronological order.
    pub async fn events_on(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let mut events = self.calendar.list_events(&self.rules.day_window(date)?).await?;
        sort_events(&mut events, self.rules.timezone);
        Ok(events)
    }

    /// Free windows of at least the minimum slot length within working hours.
    pub async fn open_slots(&self, date: NaiveDate) -> Result<Vec<OpenSlot>> {
        let window = self.rules.working_window(date)?;
        let busy = self.calendar.free_busy(&window).await?;
        Ok(available_slots(window, &busy, self.rules.min_slot))
    }

    async fn offer_slots(&self, state: &mut ConversationState, date: NaiveDate) -> Result<String> {
        let slots = self.open_slots(date).await?;
        if slots.is_empty() {
            return Ok(render::no_slots(date));
        }

        info!(%date, count = slots.len(), "offering slots");
        let reply = render::slot_offer(date, &slots);
        state.offer_slots(date, slots);
        Ok(reply)
    }

    async fn confirm_slot(&self, state: &mut ConversationState, choice: usize) -> Result<String> {
        let slot = match &state.pending {
            Pending::SlotsOffered { slots, .. } => {
                choice.checked_sub(1).and_then(|i| slots.get(i)).copied()
            }
            _ => None,
        };
        let Some(slot) = slot else {
            return Ok(render::invalid_selection(0));
        };

        // The offer stays open if the insert fails.
        let link = self
            .calendar
            .insert_event(&slot, &self.rules.default_summary)
            .await?;
        info!(%slot, choice, "offered slot booked");
        state.clear_pending();
        state.last_intent = Some(Intent::Book);
        Ok(render::booked(&slot, &link))
    }

    async fn confirm_cancellation(
        &self,
        state: &mut ConversationState,
        choice: usize,
    ) -> Result<String> {
        let (date, event) = match &state.pending {
            Pending::CancellationPending { date, events } => (
                *date,
                choice.checked_sub(1).and_then(|i| events.get(i)).cloned(),
            ),
            _ => return Ok(render::capabilities()),
        };
        let Some(event) = event else {
            return Ok(render::cancel_reprompt(0));
        };

        match self.calendar.delete_event(&event.id).await {
            Ok(()) => {}
            Err(CalendarError::NotFound(_)) => {
                state.clear_pending();
                return Ok(render::already_gone(&event));
            }
            Err(e) => return Err(e.into()),
        }
        info!(event_id = %event.id, %date, "meeting cancelled");
        state.clear_pending();
        Ok(render::cancelled(&event, date))
    }

    async fn book_window(&self, window: &TimeWindow) -> Result<String> {
        if !self.is_free(window).await? {
            return Ok(render::conflict(window));
        }
        let link = self
            .calendar
            .insert_event(window, &self.rules.default_summary)
            .await?;
        info!(%window, "meeting booked");
        Ok(render::booked(window, &link))
    }

    async fn is_free(&self, window: &TimeWindow) -> Result<bool> {
        let busy = self.calendar.free_busy(window).await?;
        Ok(is_window_free(window, &busy))
    }

    /// Place a clock range on `date`; an end before the start lands on the next day.
    fn range_window(&self, date: NaiveDate, range: TimeRange) -> std::result::Result<TimeWindow, CalendarError> {
        let tz = self.rules.timezone;
        let missing = |d: NaiveDate, t: NaiveTime| {
            CalendarError::InvalidTime(format!("{} {} does not exist in {}", d, t, tz))
        };

        let start = localize(tz, date, range.start).ok_or_else(|| missing(date, range.start))?;
        let end_date = if range.crosses_midnight() {
            date.succ_opt().ok_or_else(|| missing(date, range.end))?
        } else {
            date
        };
        let end = localize(tz, end_date, range.end).ok_or_else(|| missing(end_date, range.end))?;
        TimeWindow::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::error::Error;
    use crate::llm::{DisabledModel, Message};
    use crate::types::FixedClock;
    use async_trait::async_trait;
    use chrono_tz::Asia::Kolkata;

    struct CannedModel(String);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _messages: &[Message]) -> std::result::Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct DownModel;

    #[async_trait]
    impl LanguageModel for DownModel {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _messages: &[Message]) -> std::result::Result<String, LlmError> {
            Err(LlmError::Timeout)
        }
    }

    /// Monday, June 15, 2026.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        today().succ_opt().unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(date: NaiveDate, start: u32, end: u32) -> TimeWindow {
        let at = |h| localize(Kolkata, date, hm(h, 0)).unwrap();
        TimeWindow::new(at(start), at(end)).unwrap()
    }

    fn negotiator_with(calendar: Arc<InMemoryCalendar>, model: Arc<dyn LanguageModel>) -> Negotiator {
        let clock = FixedClock::at(Kolkata, today(), hm(8, 0)).unwrap();
        Negotiator::new(calendar, model, ScheduleRules::default()).with_clock(Arc::new(clock))
    }

    fn setup() -> (Negotiator, Arc<InMemoryCalendar>) {
        let calendar = Arc::new(InMemoryCalendar::new(Kolkata));
        (negotiator_with(calendar.clone(), Arc::new(DisabledModel)), calendar)
    }

    #[tokio::test]
    async fn test_empty_day_offers_whole_working_window() {
        let (negotiator, _) = setup();
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "are you available tomorrow?")
            .await
            .unwrap();

        assert!(reply.contains("1. 9:00 AM - 6:00 PM"));
        assert!(state.waiting_for_slot());
        assert_eq!(state.last_intent, Some(Intent::CheckAvailability));
    }

    #[tokio::test]
    async fn test_pick_second_slot_books_it() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Standup").await;
        let mut state = ConversationState::default();

        let offer = negotiator
            .respond(&mut state, "any free slots tomorrow")
            .await
            .unwrap();
        assert!(offer.contains("1. 9:00 AM - 10:00 AM"));
        assert!(offer.contains("2. 11:00 AM - 6:00 PM"));

        let reply = negotiator.respond(&mut state, "2").await.unwrap();
        assert!(reply.contains("Meeting booked successfully!"));
        assert!(reply.contains("11:00 AM - 6:00 PM"));
        assert!(!state.waiting_for_slot());

        let events = calendar.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].window(Kolkata), Some(window(tomorrow(), 11, 18)));
    }

    #[tokio::test]
    async fn test_out_of_range_pick_keeps_offer() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Standup").await;
        let mut state = ConversationState::default();
        negotiator
            .respond(&mut state, "are you free tomorrow")
            .await
            .unwrap();

        let reply = negotiator.respond(&mut state, "5").await.unwrap();
        assert_eq!(reply, render::invalid_selection(2));
        assert!(state.waiting_for_slot());

        let reply = negotiator.respond(&mut state, "sounds good").await.unwrap();
        assert_eq!(reply, render::invalid_selection(2));
        assert_eq!(calendar.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_temporal_reply_abandons_offer() {
        let (negotiator, _) = setup();
        let mut state = ConversationState::default();
        negotiator
            .respond(&mut state, "are you free tomorrow")
            .await
            .unwrap();
        assert!(state.waiting_for_slot());

        negotiator
            .respond(&mut state, "Wednesday at 5")
            .await
            .unwrap();
        assert!(!state.waiting_for_slot());
        assert_eq!(state.last_intent, Some(Intent::CheckAvailability));
    }

    #[tokio::test]
    async fn test_failed_booking_keeps_offer() {
        let (negotiator, calendar) = setup();
        let mut state = ConversationState::default();
        negotiator
            .respond(&mut state, "are you free tomorrow")
            .await
            .unwrap();

        calendar
            .fail_with(CalendarError::Unavailable("503".into()))
            .await;
        let err = negotiator.respond(&mut state, "1").await.unwrap_err();
        assert!(matches!(err, Error::Calendar(CalendarError::Unavailable(_))));
        assert!(state.waiting_for_slot());

        calendar.recover().await;
        let reply = negotiator.respond(&mut state, "1").await.unwrap();
        assert!(reply.contains("booked"));
    }

    #[tokio::test]
    async fn test_book_range_with_borrowed_pm() {
        let (negotiator, calendar) = setup();
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "book a meeting tomorrow 2 to 4pm")
            .await
            .unwrap();

        assert!(reply.contains("2:00 PM - 4:00 PM"), "{}", reply);
        let events = calendar.events().await;
        assert_eq!(events[0].window(Kolkata), Some(window(tomorrow(), 14, 16)));
    }

    #[tokio::test]
    async fn test_book_single_time_is_one_hour() {
        let (negotiator, calendar) = setup();
        let mut state = ConversationState::default();

        negotiator
            .respond(&mut state, "schedule a call tomorrow at 3pm")
            .await
            .unwrap();

        let events = calendar.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].window(Kolkata), Some(window(tomorrow(), 15, 16)));
        assert_eq!(events[0].title(), "Meeting");
    }

    #[tokio::test]
    async fn test_booking_conflict_is_reported() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 14, 15), "Review").await;
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "book tomorrow at 2:30pm")
            .await
            .unwrap();

        assert!(reply.starts_with("I'm sorry, I'm not available from 2:30 PM to 3:30 PM"));
        assert_eq!(calendar.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_book_without_date_asks() {
        let (negotiator, _) = setup();
        let mut state = ConversationState::default();
        let reply = negotiator
            .respond(&mut state, "book a meeting")
            .await
            .unwrap();
        assert_eq!(reply, render::ask_booking_date());
    }

    #[tokio::test]
    async fn test_book_range_past_midnight_ends_next_day() {
        let (negotiator, calendar) = setup();
        let mut state = ConversationState::default();

        negotiator
            .respond(&mut state, "book a meeting tomorrow 10pm to 2am")
            .await
            .unwrap();

        let events = calendar.events().await;
        assert_eq!(events.len(), 1);
        let at = |date: NaiveDate, h| localize(Kolkata, date, hm(h, 0)).unwrap();
        let expected = TimeWindow::new(at(tomorrow(), 22), at(tomorrow().succ_opt().unwrap(), 2)).unwrap();
        assert_eq!(events[0].window(Kolkata), Some(expected));
    }

    #[tokio::test]
    async fn test_meeting_request_without_verb_books() {
        for message in ["I need a meeting tomorrow at 3pm", "set a meeting for tomorrow at 3pm"] {
            let (negotiator, calendar) = setup();
            let mut state = ConversationState::default();

            let reply = negotiator.respond(&mut state, message).await.unwrap();

            assert!(reply.contains("Meeting booked successfully!"), "{}: {}", message, reply);
            assert_eq!(state.last_intent, Some(Intent::Book));
            let events = calendar.events().await;
            assert_eq!(events[0].window(Kolkata), Some(window(tomorrow(), 15, 16)));
        }
    }

    #[tokio::test]
    async fn test_what_time_works_offers_slots() {
        let (negotiator, _) = setup();
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "what time works tomorrow?")
            .await
            .unwrap();

        assert_eq!(state.last_intent, Some(Intent::CheckAvailability));
        assert!(reply.contains("1. 9:00 AM - 6:00 PM"), "{}", reply);
        assert!(state.waiting_for_slot());
    }

    #[tokio::test]
    async fn test_availability_at_time() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 11, 12), "Busy").await;
        let mut state = ConversationState::default();

        let free = negotiator
            .respond(&mut state, "are you free tomorrow at 3pm")
            .await
            .unwrap();
        assert!(free.starts_with("Yes, I'm available on Tuesday, June 16, 2026 at 3:00 PM"));

        let busy = negotiator
            .respond(&mut state, "are you free tomorrow at 11:30am")
            .await
            .unwrap();
        assert!(busy.starts_with("I'm sorry, I'm not available at 11:30 AM"));

        let late = negotiator
            .respond(&mut state, "are you free tomorrow at 7pm")
            .await
            .unwrap();
        assert_eq!(late, render::outside_hours(&negotiator.rules().hours));
        assert!(!state.waiting_for_slot());
    }

    #[tokio::test]
    async fn test_availability_for_range() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 15, 16), "Busy").await;
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "are you available tomorrow between 3 and 5pm")
            .await
            .unwrap();
        assert!(reply.starts_with("I'm sorry"));

        let reply = negotiator
            .respond(&mut state, "are you available tomorrow 10 to 11am")
            .await
            .unwrap();
        assert!(reply.starts_with("Yes, I'm free from 10:00 AM to 11:00 AM"));
        assert_eq!(calendar.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_single_meeting() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Sync").await;
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "cancel my meeting tomorrow")
            .await
            .unwrap();

        assert!(reply.starts_with("Successfully cancelled your meeting: Sync"));
        assert!(calendar.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_defaults_to_today() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Sync").await;
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "cancel my meeting")
            .await
            .unwrap();
        assert_eq!(reply, render::nothing_to_cancel(today()));
        assert_eq!(calendar.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_disambiguation_by_number_and_title() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Standup").await;
        calendar.add_event(&window(tomorrow(), 14, 15), "Design review").await;
        calendar.add_event(&window(tomorrow(), 16, 17), "Retro").await;
        let mut state = ConversationState::default();

        let list = negotiator
            .respond(&mut state, "cancel my meeting tomorrow")
            .await
            .unwrap();
        assert!(list.contains("1. Standup at 10:00 AM"));
        assert!(list.contains("2. Design review at 2:00 PM"));

        let reply = negotiator.respond(&mut state, "review").await.unwrap();
        assert!(reply.contains("Design review"));
        assert_eq!(state.pending, Pending::Idle);

        negotiator
            .respond(&mut state, "cancel my meeting tomorrow")
            .await
            .unwrap();
        let reprompt = negotiator.respond(&mut state, "9").await.unwrap();
        assert_eq!(reprompt, render::cancel_reprompt(2));

        negotiator.respond(&mut state, "1").await.unwrap();
        let titles: Vec<String> = calendar
            .events()
            .await
            .iter()
            .map(|e| e.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Retro".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_pick_by_start_time() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Standup").await;
        calendar.add_event(&window(tomorrow(), 14, 15), "Design review").await;
        let mut state = ConversationState::default();

        negotiator
            .respond(&mut state, "cancel my meeting tomorrow")
            .await
            .unwrap();
        let reply = negotiator
            .respond(&mut state, "the one at 2pm")
            .await
            .unwrap();

        assert!(reply.contains("Design review"), "{}", reply);
        assert_eq!(state.pending, Pending::Idle);
        let events = calendar.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title(), "Standup");
    }

    #[tokio::test]
    async fn test_view_calendar() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 14, 15), "Review").await;
        calendar.add_event(&window(tomorrow(), 9, 10), "Standup").await;
        let mut state = ConversationState::default();

        let reply = negotiator
            .respond(&mut state, "show my calendar for tomorrow")
            .await
            .unwrap();
        assert_eq!(
            reply,
            "Events for Tuesday, June 16, 2026:\n- 9:00 AM - 10:00 AM: Standup\n- 2:00 PM - 3:00 PM: Review"
        );

        let empty = negotiator
            .respond(&mut state, "show my calendar for today")
            .await
            .unwrap();
        assert_eq!(empty, render::empty_day(today()));
    }

    #[tokio::test]
    async fn test_general_uses_model() {
        let calendar = Arc::new(InMemoryCalendar::new(Kolkata));
        let negotiator = negotiator_with(calendar, Arc::new(CannedModel("Hello there!".into())));
        let mut state = ConversationState::default();

        let reply = negotiator.respond(&mut state, "hi").await.unwrap();
        assert_eq!(reply, "Hello there!");
        assert_eq!(state.last_intent, Some(Intent::General));
    }

    #[tokio::test]
    async fn test_general_without_model() {
        let (negotiator, _) = setup();
        let mut state = ConversationState::default();
        let reply = negotiator.respond(&mut state, "hi").await.unwrap();
        assert_eq!(reply, render::capabilities());
    }

    #[tokio::test]
    async fn test_model_outage_is_typed() {
        let calendar = Arc::new(InMemoryCalendar::new(Kolkata));
        let negotiator = negotiator_with(calendar, Arc::new(DownModel));
        let mut state = ConversationState::default();
        let err = negotiator.respond(&mut state, "hi").await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Timeout)));
    }

    #[tokio::test]
    async fn test_direct_operations() {
        let (negotiator, calendar) = setup();
        calendar.add_event(&window(tomorrow(), 10, 11), "Standup").await;

        let slots = negotiator.suggest_slots(tomorrow()).await.unwrap();
        assert_eq!(slots.len(), 16);
        assert!(slots.iter().all(|s| !s.overlaps(&window(tomorrow(), 10, 11))));

        let link = negotiator
            .book_direct(tomorrow(), hm(15, 0), Some("Interview"))
            .await
            .unwrap();
        assert!(link.starts_with("memory://events/"));

        let events = negotiator.events_on(tomorrow()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].title(), "Interview");
        assert_eq!(events[1].window(Kolkata).unwrap().duration(), chrono::Duration::minutes(30));
    }
}
