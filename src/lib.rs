//! # schedulai
//!
//! Conversational scheduling assistant.
//!
//! ## Overview
//!
//! schedulai reads free-text chat messages, works out whether the user wants
//! to book, check availability, cancel or look at their calendar, extracts
//! the date and time they mean, and negotiates against a remote calendar's
//! free/busy data to answer or to book.
//!
//! ## Core Concepts
//!
//! - **Time-phrase parsing**: "tomorrow at 3pm", "15th of June", "2 to 4pm"
//! - **Slot negotiation**: open slots are offered and picked by number
//! - **Per-session state**: each conversation negotiates independently
//! - **Typed collaborator errors**: rendered once, at the gateway
//!
//! ## Example
//!
//! ```rust,ignore
//! use schedulai::{AssistantConfig, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssistantConfig::load("config.json")?;
//!     let gateway = Gateway::connect(&config).await?;
//!     println!("{}", gateway.handle_message("default", "are you free tomorrow?").await);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod common;
pub mod parser;
pub mod schedule;
pub mod calendar;
pub mod llm;
pub mod negotiator;
pub mod gateway;
pub mod cli;

// Re-export commonly used types
pub use types::{
    BusyInterval,
    ChatTurn,
    Clock,
    ExtractedDateTime,
    FixedClock,
    OpenSlot,
    SystemClock,
    TimeWindow,
};
pub use error::{Error, Result};
pub use calendar::{CalendarEvent, CalendarProvider};
pub use gateway::{AssistantConfig, Gateway, Intent};
pub use llm::LanguageModel;
pub use negotiator::Negotiator;
pub use parser::{parse_time_range, TimePhraseParser, TimeRange};
pub use schedule::{ScheduleRules, WorkingHours};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
