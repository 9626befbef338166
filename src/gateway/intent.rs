//! Intent classification for incoming chat messages.
//!
//! The first pass is a pure keyword classifier: rules are checked in
//! priority order and the first match wins. The second pass looks at the
//! session's pending negotiation so that "2" can pick an offered slot and
//! "wednesday at 5" can abandon it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::session::Pending;
use crate::calendar::{CalendarEvent, EventTime};
use crate::parser::parse_time_of_day;

/// What the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Book,
    CheckAvailability,
    Cancel,
    ViewCalendar,
    General,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Book => "book",
            Intent::CheckAvailability => "check_availability",
            Intent::Cancel => "cancel",
            Intent::ViewCalendar => "view_calendar",
            Intent::General => "general",
        };
        f.write_str(name)
    }
}

/// Result of classifying a message against the conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A new request; any pending negotiation is abandoned.
    Fresh(Intent),
    /// 1-based pick from the offered slots.
    ConfirmSlot(usize),
    /// Not a usable slot pick; offer stays open.
    InvalidSelection,
    /// 1-based pick from the cancellation candidates.
    ConfirmCancellation(usize),
    /// Not a usable cancellation pick; candidates stay listed.
    CancelReprompt,
}

/// Conditions for rule matching.
#[derive(Debug, Clone)]
pub enum IntentCondition {
    /// Any of the keywords appears as a whole word or phrase.
    Keywords(Regex),
    /// Every inner condition matches.
    All(Vec<IntentCondition>),
}

impl IntentCondition {
    /// Build a keyword condition; multi-word keywords allow any spacing.
    pub fn keywords(words: &[&str]) -> Result<Self, regex::Error> {
        Ok(IntentCondition::Keywords(keyword_regex(words)?))
    }

    /// Check if the condition matches lower-cased text.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            IntentCondition::Keywords(re) => re.is_match(text),
            IntentCondition::All(conditions) => conditions.iter().all(|c| c.matches(text)),
        }
    }
}

/// A classification rule.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub name: String,
    pub intent: Intent,
    pub condition: IntentCondition,
    /// Priority (higher = checked first)
    pub priority: u32,
}

fn keyword_regex(words: &[&str]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = words
        .iter()
        .map(|w| {
            w.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
}

const CANCEL_VERBS: &[&str] = &["cancel", "delete", "remove", "reschedule", "call off"];
const MEETING_NOUNS: &[&str] = &[
    "meeting", "meetings", "appointment", "appointments", "event", "events", "call", "calls",
    "booking", "bookings",
];
const BOOKING_WORDS: &[&str] = &["book", "schedule", "set up", "create", "new", "arrange"];
const BOOKING_NOUNS: &[&str] = &["meeting", "meetings", "appointment", "appointments"];
const AVAILABILITY_WORDS: &[&str] = &["available", "availability", "free", "open", "slot", "slots"];
const TIMING_WORDS: &[&str] = &["time", "times", "when"];
const VIEWING_WORDS: &[&str] = &[
    "calendar", "agenda", "what do i have", "do i have", "what's on", "whats on", "show", "view",
    "list",
];
const TEMPORAL_WORDS: &[&str] = &[
    "today", "tomorrow", "tonight", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "next week", "next month", "noon", "morning", "afternoon", "evening",
    "between",
];

lazy_static! {
    static ref TEMPORAL: Regex = keyword_regex(TEMPORAL_WORDS).expect("valid keyword list");
    /// Month names; "may" only next to a day number.
    static ref MONTHS: Regex = Regex::new(
        r"\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b|\bmay\s+\d|\d(?:st|nd|rd|th)?\s+(?:of\s+)?may\b"
    )
    .expect("valid regex");
    /// "3pm", "10:30", "at 5"
    static ref CLOCK: Regex =
        Regex::new(r"\b\d{1,2}(?::\d{2})?\s*[ap]\.?m\b|\b\d{1,2}:\d{2}\b|\bat\s+\d{1,2}\b")
            .expect("valid regex");
    /// "2", " 2. ", "#2"
    static ref PURE_NUMBER: Regex = Regex::new(r"^\s*#?(\d{1,3})\s*\.?\s*$").expect("valid regex");
}

/// Keyword classifier with a context-aware second pass.
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    /// Create a classifier with the default rules.
    pub fn new() -> Self {
        let mut classifier = Self { rules: Vec::new() };
        for rule in default_rules() {
            classifier.add_rule(rule);
        }
        classifier
    }

    /// Create a classifier with no rules; everything is `General`.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule.
    pub fn add_rule(&mut self, rule: IntentRule) {
        self.rules.push(rule);
        // Stable: equal priorities keep insertion order.
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// First pass: fixed precedence, no scoring.
    pub fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(&lowered))
            .map(|rule| {
                tracing::debug!(rule = %rule.name, intent = %rule.intent, "intent rule matched");
                rule.intent
            })
            .unwrap_or(Intent::General)
    }

    /// Second pass: interpret `text` in light of the pending negotiation.
    pub fn classify_in_context(&self, text: &str, pending: &Pending) -> Classification {
        match pending {
            Pending::Idle => Classification::Fresh(self.classify(text)),
            Pending::SlotsOffered { slots, .. } => match pure_number(text) {
                Some(n) if (1..=slots.len()).contains(&n) => Classification::ConfirmSlot(n),
                Some(_) => Classification::InvalidSelection,
                None if is_temporal(text) => Classification::Fresh(self.reclassify(text)),
                None => Classification::InvalidSelection,
            },
            Pending::CancellationPending { events, .. } => {
                if let Some(n) = pure_number(text) {
                    return if (1..=events.len()).contains(&n) {
                        Classification::ConfirmCancellation(n)
                    } else {
                        Classification::CancelReprompt
                    };
                }
                let picked = match_title(text, events).or_else(|| match_start_time(text, events));
                if let Some(n) = picked {
                    return Classification::ConfirmCancellation(n);
                }
                let intent = self.classify(text);
                if is_temporal(text) || !matches!(intent, Intent::General | Intent::Cancel) {
                    Classification::Fresh(self.reclassify(text))
                } else {
                    Classification::CancelReprompt
                }
            }
        }
    }

    /// Classify a temporal reply from scratch; bare dates become availability checks.
    fn reclassify(&self, text: &str) -> Intent {
        match self.classify(text) {
            Intent::General => Intent::CheckAvailability,
            intent => intent,
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn default_rules() -> Vec<IntentRule> {
    let rule = |name: &str, intent: Intent, condition: IntentCondition, priority: u32| IntentRule {
        name: name.to_string(),
        intent,
        condition,
        priority,
    };
    let keywords = |words: &[&str]| {
        IntentCondition::Keywords(keyword_regex(words).expect("valid keyword list"))
    };

    vec![
        rule(
            "cancel",
            Intent::Cancel,
            IntentCondition::All(vec![keywords(CANCEL_VERBS), keywords(MEETING_NOUNS)]),
            100,
        ),
        rule("book", Intent::Book, keywords(BOOKING_WORDS), 90),
        rule("availability", Intent::CheckAvailability, keywords(AVAILABILITY_WORDS), 80),
        rule("meeting", Intent::Book, keywords(BOOKING_NOUNS), 75),
        rule("view", Intent::ViewCalendar, keywords(VIEWING_WORDS), 70),
        rule("timing", Intent::CheckAvailability, keywords(TIMING_WORDS), 65),
        rule("month", Intent::Book, IntentCondition::Keywords(MONTHS.clone()), 60),
    ]
}

/// A reply consisting of a single number.
pub fn pure_number(text: &str) -> Option<usize> {
    PURE_NUMBER.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Whether a reply talks about dates or times.
pub fn is_temporal(text: &str) -> bool {
    let lowered = text.to_lowercase();
    TEMPORAL.is_match(&lowered) || MONTHS.is_match(&lowered) || CLOCK.is_match(&lowered)
}

/// 1-based index of the only event whose title matches the reply.
fn match_title(text: &str, events: &[CalendarEvent]) -> Option<usize> {
    let reply = text.trim().to_lowercase();
    if reply.len() < 3 {
        return None;
    }

    let mut hits = events.iter().enumerate().filter(|(_, event)| {
        let title = event.title().to_lowercase();
        event.summary.is_some() && (title.contains(&reply) || reply.contains(&title))
    });

    match (hits.next(), hits.next()) {
        (Some((idx, _)), None) => Some(idx + 1),
        _ => None,
    }
}

/// 1-based index of the only event starting at the clock time in the reply.
///
/// Replies naming a day or month are left to the temporal fallback.
fn match_start_time(text: &str, events: &[CalendarEvent]) -> Option<usize> {
    let lowered = text.to_lowercase();
    if !CLOCK.is_match(&lowered) || TEMPORAL.is_match(&lowered) || MONTHS.is_match(&lowered) {
        return None;
    }
    let time = parse_time_of_day(&lowered)?;

    let mut hits = events.iter().enumerate().filter(|(_, event)| match event.start {
        EventTime::DateTime(start) => start.time() == time,
        EventTime::Date(_) => false,
    });

    match (hits.next(), hits.next()) {
        (Some((idx, _)), None) => Some(idx + 1),
        _ => None,
    }
}
