//! Language-model collaborator.
//!
//! Used for free-form replies to messages that are not scheduling requests,
//! and as a secondary date extractor (see [`extract`]). Running without a
//! model is a supported configuration: [`DisabledModel`] answers every call
//! with [`LlmError::NotConfigured`].

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{ChatTurn, Role};

pub mod client;
pub mod extract;

pub use client::ChatCompletionsClient;
pub use extract::LlmDateExtractor;

/// Fixed persona for conversational replies.
pub const PERSONA: &str = "You are SchedulAI, a friendly and professional calendar scheduling assistant. \
Your goal is to help users manage their calendar, book meetings and check availability.

Guidelines:
- Be warm, concise and helpful
- If you need more information, ask a specific question
- When confirming actions, summarize the details
- Keep responses brief

You can help with booking meetings, checking availability, viewing calendar events and cancelling meetings.";

/// Number of user/assistant exchanges replayed into a conversational prompt.
pub const HISTORY_EXCHANGES: usize = 2;

/// Chat-completion message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

impl From<&ChatTurn> for Message {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            Role::User => Message::user(turn.content.clone()),
            Role::Assistant => Message::assistant(turn.content.clone()),
        }
    }
}

/// A chat-completion style language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Complete the conversation and return the reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// Stand-in used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// Build the prompt for a conversational reply.
///
/// `history` must not yet contain `message`; only the last
/// [`HISTORY_EXCHANGES`] exchanges are replayed.
pub fn conversation_prompt(history: &[ChatTurn], message: &str, now: DateTime<Tz>) -> Vec<Message> {
    let mut messages = vec![Message::system(PERSONA)];

    let keep = HISTORY_EXCHANGES * 2;
    let skip = history.len().saturating_sub(keep);
    messages.extend(history.iter().skip(skip).map(Message::from));

    messages.push(Message::user(format!(
        "Current context:\n- User's timezone: {}\n- Current time: {}\n\nUser's message: {}",
        now.timezone().name(),
        now.format("%A, %B %-d, %Y at %-I:%M %p"),
        message
    )));
    messages
}
