//! Model-assisted date extraction with a strict reply contract.
//!
//! The model must answer with a block such as:
//!
//! ```text
//! [DATE_TIME]
//! Date: 2026-06-16
//! Time: 15:00
//! [/DATE_TIME]
//! ```
//!
//! Anything else (or any model failure) falls back to the time-phrase parser.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{LanguageModel, Message};
use crate::parser::TimePhraseParser;
use crate::types::ExtractedDateTime;

lazy_static! {
    static ref BLOCK: Regex =
        Regex::new(r"(?s)\[DATE_TIME\](.*?)\[/DATE_TIME\]").expect("valid regex");
    static ref DATE_LINE: Regex = Regex::new(r"Date:\s*(\d{4}-\d{2}-\d{2})").expect("valid regex");
    static ref TIME_LINE: Regex = Regex::new(r"Time:\s*(\d{1,2}:\d{2})").expect("valid regex");
}

/// Extracts dates with the model first and the parser as fallback.
pub struct LlmDateExtractor {
    model: Arc<dyn LanguageModel>,
    parser: Arc<TimePhraseParser>,
    enabled: bool,
}

impl LlmDateExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, parser: Arc<TimePhraseParser>) -> Self {
        Self { model, parser, enabled: true }
    }

    /// Skip the model entirely and use only the parser.
    pub fn parser_only(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Extract a date and time from `message`; never fails.
    pub async fn extract(&self, message: &str, now: DateTime<Tz>) -> ExtractedDateTime {
        if self.enabled {
            match self.model.complete(&extraction_prompt(message, now)).await {
                Ok(reply) => match parse_reply(&reply) {
                    Some(found) => {
                        debug!(date = ?found.date, time = ?found.time, "model extracted date");
                        return found;
                    }
                    None => debug!(%reply, "model reply did not match the date contract"),
                },
                Err(e) => warn!(error = %e, "model date extraction failed, using parser"),
            }
        }
        self.parser.parse(message, now.date_naive())
    }
}

/// Prompt asking the model for a `[DATE_TIME]` block.
pub fn extraction_prompt(message: &str, now: DateTime<Tz>) -> Vec<Message> {
    let tomorrow = now + Duration::days(1);
    vec![Message::user(format!(
        "Extract the exact date and time from the user's message.

Rules:
1. If only a time is mentioned, assume today's date
2. If only a date is mentioned, return just the date
3. Use 24-hour format for times
4. If the date is not specified, use today or the next occurrence
5. Current date and time: {now} ({tz})

User's message: \"{message}\"

Respond ONLY with the extracted date and time in this exact format:
[DATE_TIME]
Date: YYYY-MM-DD
Time: HH:MM
[/DATE_TIME]

Example: \"Book a meeting tomorrow afternoon\"
[DATE_TIME]
Date: {tomorrow}
Time: 15:00
[/DATE_TIME]",
        now = now.format("%Y-%m-%d %H:%M"),
        tz = now.timezone().name(),
        message = message,
        tomorrow = tomorrow.format("%Y-%m-%d"),
    ))]
}

/// Read a `[DATE_TIME]` block; `None` unless it holds a valid date or time.
pub fn parse_reply(reply: &str) -> Option<ExtractedDateTime> {
    let block = BLOCK.captures(reply)?.get(1)?.as_str();

    let date = DATE_LINE
        .captures(block)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());
    let time = TIME_LINE
        .captures(block)
        .and_then(|c| NaiveTime::parse_from_str(&c[1], "%H:%M").ok());

    let found = ExtractedDateTime::new(date, time);
    (!found.is_empty()).then_some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::DisabledModel;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn now() -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
    }

    fn extractor(model: Arc<dyn LanguageModel>) -> LlmDateExtractor {
        LlmDateExtractor::new(model, Arc::new(TimePhraseParser::new()))
    }

    #[test]
    fn test_parse_reply() {
        let found = parse_reply("Sure!\n[DATE_TIME]\nDate: 2026-06-20\nTime: 11:30\n[/DATE_TIME]").unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 20));
        assert_eq!(found.time, NaiveTime::from_hms_opt(11, 30, 0));

        let date_only = parse_reply("[DATE_TIME]\nDate: 2026-06-20\n[/DATE_TIME]").unwrap();
        assert_eq!(date_only.time, None);
    }

    #[test]
    fn test_parse_reply_rejects_off_contract() {
        assert!(parse_reply("Date: 2026-06-20").is_none());
        assert!(parse_reply("[DATE_TIME]\nDate: 2026-02-31\n[/DATE_TIME]").is_none());
        assert!(parse_reply("[DATE_TIME]\nsometime soon\n[/DATE_TIME]").is_none());
    }

    #[tokio::test]
    async fn test_model_answer_is_used() {
        let model = Arc::new(CannedModel("[DATE_TIME]\nDate: 2026-06-18\nTime: 09:00\n[/DATE_TIME]"));
        let found = extractor(model).extract("cancel thursday's standup", now()).await;
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 18));
        assert_eq!(found.time, NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[tokio::test]
    async fn test_falls_back_to_parser() {
        let found = extractor(Arc::new(CannedModel("I think Thursday?")))
            .extract("cancel my meeting tomorrow", now())
            .await;
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 16));

        let found = extractor(Arc::new(DisabledModel))
            .extract("cancel my meeting tomorrow", now())
            .await;
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 16));
    }

    #[tokio::test]
    async fn test_parser_only() {
        let found = extractor(Arc::new(CannedModel("[DATE_TIME]\nDate: 2030-01-01\n[/DATE_TIME]")))
            .parser_only()
            .extract("cancel the meeting today", now())
            .await;
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 6, 15));
    }
}
