//! Error types for schedulai.
//!
//! This module defines all error types used throughout the system.
//! Collaborator failures stay typed all the way up to the gateway, which is
//! the only place they are turned into user-facing text.

use std::time::Duration;
use thiserror::Error;

/// Main error type for schedulai operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Calendar collaborator errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Language-model collaborator errors
    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    /// Session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for schedulai.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors related to the Gateway and its HTTP server.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

/// Errors reported by the calendar collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Rate limited, retry after {retry_after}ms")]
    RateLimited { retry_after: u64 },

    #[error("Calendar service unavailable: {0}")]
    Unavailable(String),

    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

impl CalendarError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CalendarError::Network(_)
                | CalendarError::Timeout
                | CalendarError::RateLimited { .. }
                | CalendarError::Unavailable(_)
        )
    }

    /// Whether the failure is an authorization problem.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            CalendarError::Unauthorized(_) | CalendarError::InsufficientPermissions(_)
        )
    }
}

/// Errors reported by the language-model collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Language model is not configured")]
    NotConfigured,

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited, retry after {retry_after}ms")]
    RateLimited { retry_after: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::Timeout | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors that can be retried by [`crate::common::retry`].
pub trait Retryable {
    /// Whether the operation should be attempted again.
    fn should_retry(&self) -> bool;

    /// Server-provided delay before the next attempt, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for CalendarError {
    fn should_retry(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CalendarError::RateLimited { retry_after } => Some(Duration::from_millis(*retry_after)),
            _ => None,
        }
    }
}

impl Retryable for LlmError {
    fn should_retry(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(Duration::from_millis(*retry_after)),
            _ => None,
        }
    }
}

/// Errors related to Sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid session id: {0}")]
    InvalidId(String),
}

/// Errors related to Configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid config value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required config: {0}")]
    MissingRequired(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
