//! Assistant configuration.
//!
//! One JSON document with a section per concern. Every field has a default,
//! so an empty `{}` is a valid (offline, in-memory) configuration. Secrets
//! are never stored in the file; the config only names the environment
//! variables that hold them.

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::session::SessionManagerConfig;
use crate::common::RetryPolicy;
use crate::error::ConfigError;
use crate::schedule::{ScheduleRules, WorkingHours};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

/// Timezone, working hours and meeting lengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone name
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Start of the working day, "HH:MM"
    #[serde(default = "default_work_start")]
    pub work_start: String,

    /// End of the working day, "HH:MM"
    #[serde(default = "default_work_end")]
    pub work_end: String,

    #[serde(default = "default_thirty")]
    pub min_slot_minutes: i64,

    #[serde(default = "default_thirty")]
    pub suggestion_step_minutes: i64,

    /// Length of a chat booking made from a single start time
    #[serde(default = "default_meeting_minutes")]
    pub meeting_minutes: i64,

    /// Length of a booking made through the direct endpoint
    #[serde(default = "default_thirty")]
    pub direct_booking_minutes: i64,

    #[serde(default = "default_summary")]
    pub default_summary: String,
}

/// Which calendar backs the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    Google,
    Memory,
}

/// Calendar collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_kind")]
    pub provider: CalendarKind,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default = "default_calendar_api_base")]
    pub api_base: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_refresh_token_env")]
    pub refresh_token_env: String,

    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

/// Language-model collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Use the model at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Ask the model for dates before falling back to the parser
    #[serde(default = "default_true")]
    pub extract_dates: bool,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session timeout in seconds
    #[serde(default = "default_session_timeout")]
    pub timeout_seconds: u64,

    /// Turns kept per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Seconds between expired-session sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

/// Collaborator call limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging format
    #[serde(default)]
    pub json_format: bool,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_work_start() -> String {
    "09:00".to_string()
}

fn default_work_end() -> String {
    "18:00".to_string()
}

fn default_thirty() -> i64 {
    30
}

fn default_meeting_minutes() -> i64 {
    60
}

fn default_summary() -> String {
    "Meeting".to_string()
}

fn default_calendar_kind() -> CalendarKind {
    CalendarKind::Google
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_calendar_api_base() -> String {
    crate::calendar::google::GOOGLE_CALENDAR_API_BASE.to_string()
}

fn default_token_url() -> String {
    crate::calendar::token::GOOGLE_TOKEN_URL.to_string()
}

fn default_access_token_env() -> String {
    "GOOGLE_CALENDAR_ACCESS_TOKEN".to_string()
}

fn default_refresh_token_env() -> String {
    "GOOGLE_CALENDAR_REFRESH_TOKEN".to_string()
}

fn default_client_id_env() -> String {
    "GOOGLE_CALENDAR_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "GOOGLE_CALENDAR_CLIENT_SECRET".to_string()
}

fn default_llm_api_url() -> String {
    crate::llm::client::DEFAULT_API_URL.to_string()
}

fn default_llm_model() -> String {
    crate::llm::client::DEFAULT_MODEL.to_string()
}

fn default_llm_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

fn default_session_timeout() -> u64 {
    3600 // 1 hour
}

fn default_history_limit() -> usize {
    10
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            work_start: default_work_start(),
            work_end: default_work_end(),
            min_slot_minutes: default_thirty(),
            suggestion_step_minutes: default_thirty(),
            meeting_minutes: default_meeting_minutes(),
            direct_booking_minutes: default_thirty(),
            default_summary: default_summary(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            provider: default_calendar_kind(),
            calendar_id: default_calendar_id(),
            api_base: default_calendar_api_base(),
            token_url: default_token_url(),
            access_token_env: default_access_token_env(),
            refresh_token_env: default_refresh_token_env(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            extract_dates: default_true(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_session_timeout(),
            history_limit: default_history_limit(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AssistantConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Note: port 0 is valid - it means "let the OS assign a port"
        let rules = self.schedule_rules()?;

        if rules.hours.start >= rules.hours.end {
            return Err(invalid("schedule.work_end", "must be later than work_start"));
        }

        let positive = [
            ("schedule.min_slot_minutes", self.schedule.min_slot_minutes),
            ("schedule.suggestion_step_minutes", self.schedule.suggestion_step_minutes),
            ("schedule.meeting_minutes", self.schedule.meeting_minutes),
            ("schedule.direct_booking_minutes", self.schedule.direct_booking_minutes),
        ];
        for (key, minutes) in positive {
            if minutes <= 0 {
                return Err(invalid(key, "must be a positive number of minutes"));
            }
        }

        if self.session.history_limit == 0 {
            return Err(invalid("session.history_limit", "must keep at least one turn"));
        }

        if self.retry.timeout_seconds == 0 {
            return Err(invalid("retry.timeout_seconds", "must be at least one second"));
        }

        if self.calendar.provider == CalendarKind::Google && self.calendar.calendar_id.is_empty() {
            return Err(ConfigError::MissingRequired("calendar.calendar_id".to_string()));
        }

        Ok(())
    }

    /// Get the server address string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The scheduling rules this configuration describes.
    pub fn schedule_rules(&self) -> Result<ScheduleRules, ConfigError> {
        let timezone: Tz = self
            .schedule
            .timezone
            .parse()
            .map_err(|_| invalid("schedule.timezone", "not an IANA timezone name"))?;
        let start = parse_clock("schedule.work_start", &self.schedule.work_start)?;
        let end = parse_clock("schedule.work_end", &self.schedule.work_end)?;

        Ok(ScheduleRules {
            timezone,
            hours: WorkingHours::new(start, end),
            min_slot: minutes("schedule.min_slot_minutes", self.schedule.min_slot_minutes)?,
            suggestion_step: minutes(
                "schedule.suggestion_step_minutes",
                self.schedule.suggestion_step_minutes,
            )?,
            meeting_length: minutes("schedule.meeting_minutes", self.schedule.meeting_minutes)?,
            direct_booking_length: minutes(
                "schedule.direct_booking_minutes",
                self.schedule.direct_booking_minutes,
            )?,
            default_summary: self.schedule.default_summary.clone(),
        })
    }

    pub fn session_config(&self) -> SessionManagerConfig {
        SessionManagerConfig {
            timeout_seconds: self.session.timeout_seconds,
            history_limit: self.session.history_limit,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(
            self.retry.max_retries,
            self.retry.initial_delay_ms,
            self.retry.max_delay_ms,
        )
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retry.timeout_seconds)
    }

    /// Create a configuration for testing.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // OS will assign a port
                cors_enabled: true,
            },
            calendar: CalendarConfig {
                provider: CalendarKind::Memory,
                ..Default::default()
            },
            llm: LlmConfig {
                enabled: false,
                ..Default::default()
            },
            retry: RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid(key, "expected HH:MM"))
}

fn minutes(key: &str, value: i64) -> Result<Duration, ConfigError> {
    Duration::try_minutes(value).ok_or_else(|| invalid(key, "out of range"))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
