//! User-facing reply text.
//!
//! Every string the assistant says is built here, so the wording of a flow
//! can be read (and tested) without the flow itself.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;

use crate::calendar::CalendarEvent;
use crate::error::{CalendarError, Error, LlmError};
use crate::schedule::WorkingHours;
use crate::types::{OpenSlot, TimeWindow};

/// "3:00 PM"
pub fn clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// "Monday, June 15, 2026"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// "Monday, June 15"
pub fn short_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

/// "9 AM", or "9:30 AM" when not on the hour.
fn hour_label(time: NaiveTime) -> String {
    if time.minute() == 0 {
        time.format("%-I %p").to_string()
    } else {
        clock(time)
    }
}

fn span(window: &TimeWindow) -> String {
    format!("{} to {}", clock(window.start().time()), clock(window.end().time()))
}

fn event_time(at: Option<DateTime<Tz>>) -> String {
    at.map(|t| clock(t.time())).unwrap_or_else(|| "?".to_string())
}

pub fn ask_availability_date() -> String {
    "I'd be happy to check my availability. Could you please tell me which date and time you're interested in?".to_string()
}

pub fn ask_booking_date() -> String {
    "I'd be happy to help you book a meeting. Could you please tell me when you'd like to schedule it?".to_string()
}

pub fn ask_range_date() -> String {
    "I couldn't determine the date. Please include a date with your request.".to_string()
}

pub fn ask_view_date() -> String {
    "Which day would you like me to look at? For example \"today\", \"tomorrow\" or \"June 20\".".to_string()
}

pub fn capabilities() -> String {
    "I'm not sure how to help with that. I can help you book meetings, check availability, cancel meetings, or view your calendar.".to_string()
}

pub fn outside_hours(hours: &WorkingHours) -> String {
    format!(
        "I'm only available between {} and {}. Would you like to pick another time?",
        hour_label(hours.start),
        hour_label(hours.end)
    )
}

pub fn available_at(window: &TimeWindow) -> String {
    format!(
        "Yes, I'm available on {} at {}. Would you like to book this time?",
        long_date(window.start().date_naive()),
        clock(window.start().time())
    )
}

pub fn unavailable_at(window: &TimeWindow) -> String {
    format!(
        "I'm sorry, I'm not available at {} on {}. Would you like to check another time?",
        clock(window.start().time()),
        short_date(window.start().date_naive())
    )
}

pub fn range_free(window: &TimeWindow) -> String {
    format!(
        "Yes, I'm free from {} on {}. Would you like me to book it?",
        span(window),
        short_date(window.start().date_naive())
    )
}

/// The requested window overlaps an existing event.
pub fn conflict(window: &TimeWindow) -> String {
    format!(
        "I'm sorry, I'm not available from {} on {}. Would you like to try another time?",
        span(window),
        short_date(window.start().date_naive())
    )
}

pub fn no_slots(date: NaiveDate) -> String {
    format!(
        "I don't have any available slots on {}. Would you like to check another day?",
        long_date(date)
    )
}

pub fn slot_offer(date: NaiveDate, slots: &[OpenSlot]) -> String {
    let mut lines = vec![format!(
        "I'm available on {} at the following times:",
        long_date(date)
    )];
    for (i, slot) in slots.iter().enumerate() {
        lines.push(format!(
            "{}. {} - {}",
            i + 1,
            clock(slot.start().time()),
            clock(slot.end().time())
        ));
    }
    lines.push(String::new());
    lines.push(
        "Please let me know which time slot works best for you by entering the number, or suggest another time."
            .to_string(),
    );
    lines.join("\n")
}

pub fn invalid_selection(offered: usize) -> String {
    match offered {
        0 => "There are no slots waiting for a choice. Which day should I check?".to_string(),
        1 => "Please reply with 1 to book the slot, or ask about another time.".to_string(),
        n => format!(
            "Please pick a slot number between 1 and {}, or ask about another time.",
            n
        ),
    }
}

pub fn booked(window: &TimeWindow, link: &str) -> String {
    format!(
        "Meeting booked successfully!\nDate: {}\nTime: {} - {}\n\n{}",
        long_date(window.start().date_naive()),
        clock(window.start().time()),
        clock(window.end().time()),
        link
    )
}

pub fn nothing_to_cancel(date: NaiveDate) -> String {
    format!("No meetings found for {} to cancel.", long_date(date))
}

pub fn cancelled(event: &CalendarEvent, date: NaiveDate) -> String {
    format!(
        "Successfully cancelled your meeting: {} on {}",
        event.title(),
        long_date(date)
    )
}

pub fn already_gone(event: &CalendarEvent) -> String {
    format!(
        "\"{}\" is no longer on your calendar, so there is nothing left to cancel.",
        event.title()
    )
}

pub fn cancel_choices(date: NaiveDate, events: &[CalendarEvent], tz: Tz) -> String {
    let mut lines = vec![format!("I found multiple meetings on {}:", long_date(date))];
    for (i, event) in events.iter().enumerate() {
        lines.push(format!(
            "{}. {} at {}",
            i + 1,
            event.title(),
            event_time(event.start.to_zoned(tz))
        ));
    }
    lines.push(String::new());
    lines.push("Please specify which meeting you'd like to cancel by number or name.".to_string());
    lines.join("\n")
}

pub fn cancel_reprompt(candidates: usize) -> String {
    format!(
        "I couldn't tell which meeting you meant. Reply with a number from 1 to {} or part of the meeting's name.",
        candidates
    )
}

pub fn empty_day(date: NaiveDate) -> String {
    format!("You don't have any events scheduled on {}.", long_date(date))
}

/// Chronological listing of a day's events.
pub fn agenda(date: NaiveDate, events: &[CalendarEvent], tz: Tz) -> String {
    let mut lines = vec![format!("Events for {}:", long_date(date))];
    for event in events {
        let when = if event.is_all_day() {
            "All day".to_string()
        } else {
            format!(
                "{} - {}",
                event_time(event.start.to_zoned(tz)),
                event_time(event.end.to_zoned(tz))
            )
        };
        lines.push(format!("- {}: {}", when, event.title()));
        if let Some(location) = event.location.as_deref().filter(|l| !l.trim().is_empty()) {
            lines.push(format!("  {}", location));
        }
    }
    lines.join("\n")
}

/// Apology for a failed request. Each failure family gets its own wording.
pub fn failure(error: &Error) -> String {
    match error {
        Error::Calendar(e) if e.is_auth() => {
            "I'm sorry, I don't have permission to access the calendar right now. Please check the calendar credentials and try again.".to_string()
        }
        Error::Calendar(CalendarError::InvalidTime(_)) => {
            "That time doesn't exist in my timezone. Could you pick a different time?".to_string()
        }
        Error::Calendar(_) => {
            "I'm sorry, I couldn't reach the calendar just now. Please try again in a moment.".to_string()
        }
        Error::Llm(LlmError::NotConfigured) => capabilities(),
        Error::Llm(_) => {
            "I'm sorry, my language service is unavailable at the moment. I can still book meetings, check availability, or show your calendar.".to_string()
        }
        _ => "I apologize, but I'm having trouble processing your request. Could you please try again?".to_string(),
    }
}
