//! Gateway module for schedulai.
//!
//! The Gateway is the single entry point for chat messages. It owns the
//! session manager and the negotiator, and it is the only place where
//! errors become user-facing text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Gateway                          │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐      │
//! │  │  Session   │  │   Intent   │  │ Negotiator │      │
//! │  │  Manager   │  │ Classifier │  │            │      │
//! │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘      │
//! │        └───────────────┼───────────────┘             │
//! │                        ↓                             │
//! │          ┌──────────────────────────────┐            │
//! │          │ Calendar / Language model     │            │
//! │          └──────────────────────────────┘            │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod intent;
pub mod server;
pub mod session;

pub use config::{AssistantConfig, CalendarKind};
pub use intent::{Classification, Intent, IntentClassifier};
pub use server::GatewayServer;
pub use session::{ConversationState, Pending, SessionInfo, SessionManager};

use std::sync::Arc;
use tracing::{info, warn};

use crate::calendar::token::{token_source_from_parts, OAuthCredentials};
use crate::calendar::{CalendarProvider, GoogleCalendar, InMemoryCalendar};
use crate::error::{Error, Result};
use crate::llm::{ChatCompletionsClient, DisabledModel, LanguageModel};
use crate::negotiator::{render, Negotiator};
use crate::types::ChatTurn;

/// Session id used when a client does not send one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Main Gateway structure.
pub struct Gateway {
    negotiator: Negotiator,
    sessions: SessionManager,
}

impl Gateway {
    /// Create a gateway from already built parts.
    pub fn new(negotiator: Negotiator, sessions: SessionManager) -> Self {
        Self { negotiator, sessions }
    }

    /// Build collaborators from configuration.
    ///
    /// Fails when the calendar cannot produce an access token; there is no
    /// useful degraded mode without one.
    pub async fn connect(config: &AssistantConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.schedule_rules()?;

        let calendar = build_calendar(config, rules.timezone).await?;
        let model = build_model(config);
        info!(calendar = calendar.name(), model = model.name(), timezone = %rules.timezone, "gateway collaborators ready");

        let mut negotiator = Negotiator::new(calendar, model, rules);
        if !config.llm.extract_dates {
            negotiator = negotiator.without_model_extraction();
        }

        Ok(Self::new(
            negotiator,
            SessionManager::with_config(config.session_config()),
        ))
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Process one chat message and return the reply.
    ///
    /// Never fails: every error is logged and rendered here.
    pub async fn handle_message(&self, session_id: &str, message: &str) -> String {
        let message = message.trim();
        if message.is_empty() {
            return render::capabilities();
        }

        let session = match self.sessions.get_or_create(session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(session_id, error = %e, "session lookup failed");
                return render::failure(&Error::from(e));
            }
        };

        // Held for the whole message so one session is handled serially.
        let mut session = session.lock().await;
        let reply = match self.negotiator.respond(&mut session.state, message).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id, error = %e, "message handling failed");
                render::failure(&e)
            }
        };

        session.state.push_turn(ChatTurn::user(message));
        session.state.push_turn(ChatTurn::assistant(reply.clone()));
        reply
    }

    /// Forget a session's state. Returns whether it existed.
    pub async fn reset_session(&self, session_id: &str) -> bool {
        let existed = self.sessions.reset(session_id).await;
        if existed {
            info!(session_id, "session reset");
        }
        existed
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

async fn build_calendar(
    config: &AssistantConfig,
    timezone: chrono_tz::Tz,
) -> Result<Arc<dyn CalendarProvider>> {
    let calendar = &config.calendar;
    match calendar.provider {
        CalendarKind::Memory => Ok(Arc::new(InMemoryCalendar::new(timezone))),
        CalendarKind::Google => {
            let credentials = match (
                env_var(&calendar.refresh_token_env),
                env_var(&calendar.client_id_env),
                env_var(&calendar.client_secret_env),
            ) {
                (Some(refresh_token), Some(client_id), Some(client_secret)) => Some(OAuthCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                }),
                _ => None,
            };
            let tokens = token_source_from_parts(
                env_var(&calendar.access_token_env),
                credentials,
                &calendar.token_url,
            )?;
            tokens.access_token().await?;

            Ok(Arc::new(
                GoogleCalendar::new(calendar.calendar_id.clone(), timezone, tokens)
                    .with_api_base(calendar.api_base.clone())
                    .with_timeout(config.request_timeout())
                    .with_retry(config.retry_policy()),
            ))
        }
    }
}

fn build_model(config: &AssistantConfig) -> Arc<dyn LanguageModel> {
    if !config.llm.enabled {
        return Arc::new(DisabledModel);
    }
    match env_var(&config.llm.api_key_env) {
        Some(key) => Arc::new(
            ChatCompletionsClient::new(key)
                .with_model(config.llm.model.clone())
                .with_api_url(config.llm.api_url.clone())
                .with_timeout(config.request_timeout())
                .with_retry(config.retry_policy()),
        ),
        None => {
            warn!(env = %config.llm.api_key_env, "no language model key set, conversational replies disabled");
            Arc::new(DisabledModel)
        }
    }
}
