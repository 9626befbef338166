//! Session management for schedulai.
//!
//! Every chat session owns its own [`ConversationState`]: the negotiation
//! in progress and a bounded history. Sessions are keyed by the caller's
//! session id and expire after an idle timeout.

use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::intent::Intent;
use crate::calendar::CalendarEvent;
use crate::error::SessionError;
use crate::types::{ChatTurn, OpenSlot};

/// Longest accepted session id.
const MAX_ID_LENGTH: usize = 128;

/// The negotiation a session is in the middle of.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Pending {
    #[default]
    Idle,
    /// Slots were listed and the user is expected to pick one.
    SlotsOffered { date: NaiveDate, slots: Vec<OpenSlot> },
    /// Several events matched a cancellation and the user must choose.
    CancellationPending {
        date: NaiveDate,
        events: Vec<CalendarEvent>,
    },
}

/// Per-session conversation state.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub last_intent: Option<Intent>,
    pub pending: Pending,
    history: VecDeque<ChatTurn>,
    history_limit: usize,
}

impl ConversationState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            last_intent: None,
            pending: Pending::Idle,
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Whether offered slots are awaiting a pick.
    pub fn waiting_for_slot(&self) -> bool {
        matches!(self.pending, Pending::SlotsOffered { .. })
    }

    pub fn offer_slots(&mut self, date: NaiveDate, slots: Vec<OpenSlot>) {
        self.pending = Pending::SlotsOffered { date, slots };
    }

    pub fn await_cancellation(&mut self, date: NaiveDate, events: Vec<CalendarEvent>) {
        self.pending = Pending::CancellationPending { date, events };
    }

    pub fn clear_pending(&mut self) {
        self.pending = Pending::Idle;
    }

    /// Append a turn, evicting the oldest beyond the limit.
    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.history.push_back(turn);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// History, oldest first.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(SessionManagerConfig::default().history_limit)
    }
}

/// A chat session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub state: ConversationState,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
}

impl Session {
    pub fn new(id: &str, history_limit: usize, now: u64) -> Self {
        Self {
            id: id.to_string(),
            state: ConversationState::new(history_limit),
            created_at: now,
        }
    }
}

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Idle time after which a session is discarded.
    pub timeout_seconds: u64,
    /// Turns kept per session.
    pub history_limit: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 3600,
            history_limit: 10,
        }
    }
}

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    created_at: u64,
    last_activity: u64,
}

impl SessionSlot {
    fn is_expired(&self, timeout_seconds: u64, now: u64) -> bool {
        now.saturating_sub(self.last_activity) / 1000 > timeout_seconds
    }
}

/// Owns every live session.
///
/// The map lock is held only for lookups; a session's own lock is held by
/// whoever is processing a message for it, so one session's messages are
/// handled one at a time.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, SessionSlot>>,
    config: SessionManagerConfig,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new() -> Self {
        Self::with_config(SessionManagerConfig::default())
    }

    /// Create a session manager with custom configuration.
    pub fn with_config(config: SessionManagerConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    /// Get the live session for `id`, creating it (or replacing an expired one).
    pub async fn get_or_create(&self, id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.get_or_create_at(id, now_millis()).await
    }

    /// [`Self::get_or_create`] at an explicit time.
    pub async fn get_or_create_at(
        &self,
        id: &str,
        now: u64,
    ) -> Result<Arc<Mutex<Session>>, SessionError> {
        validate_id(id)?;
        let mut sessions = self.sessions.lock().await;

        if let Some(slot) = sessions.get_mut(id) {
            if !slot.is_expired(self.config.timeout_seconds, now) {
                slot.last_activity = now;
                return Ok(slot.session.clone());
            }
            tracing::info!(session_id = id, "session expired, starting fresh");
        }

        let session = Arc::new(Mutex::new(Session::new(id, self.config.history_limit, now)));
        sessions.insert(
            id.to_string(),
            SessionSlot {
                session: session.clone(),
                created_at: now,
                last_activity: now,
            },
        );
        tracing::debug!(session_id = id, "session created");
        Ok(session)
    }

    /// Drop a session. Returns whether it existed.
    pub async fn reset(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    /// Clean up expired sessions.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(now_millis()).await
    }

    /// [`Self::cleanup_expired`] at an explicit time.
    pub async fn cleanup_expired_at(&self, now: u64) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let timeout = self.config.timeout_seconds;
        sessions.retain(|_, slot| !slot.is_expired(timeout, now));
        before - sessions.len()
    }

    /// Get the number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Describe every live session, most recently active first.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let snapshot: Vec<(Arc<Mutex<Session>>, u64, u64)> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|slot| (slot.session.clone(), slot.created_at, slot.last_activity))
            .collect();

        let mut infos = Vec::with_capacity(snapshot.len());
        for (session, created_at, last_activity) in snapshot {
            let session = session.lock().await;
            infos.push(SessionInfo {
                id: session.id.clone(),
                last_intent: session.state.last_intent,
                waiting_for_slot: session.state.waiting_for_slot(),
                history_length: session.state.history_len(),
                created_at,
                last_activity,
            });
        }
        infos.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        infos
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_id(id: &str) -> Result<(), SessionError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(id.to_string()))
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Session information for API responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub last_intent: Option<Intent>,
    pub waiting_for_slot: bool,
    /// Number of turns in history
    pub history_length: usize,
    /// Creation timestamp
    pub created_at: u64,
    /// Last activity timestamp
    pub last_activity: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: u64 = 3_600_000;

    #[tokio::test]
    async fn test_get_or_create_reuses_live_session() {
        let manager = SessionManager::new();
        let a = manager.get_or_create_at("alice", 1_000).await.unwrap();
        a.lock().await.state.last_intent = Some(Intent::Book);

        let again = manager.get_or_create_at("alice", 2_000).await.unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(again.lock().await.state.last_intent, Some(Intent::Book));

        let other = manager.get_or_create_at("bob", 2_000).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(manager.count().await, 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let manager = SessionManager::new();
        let first = manager.get_or_create_at("alice", 0).await.unwrap();
        first.lock().await.state.last_intent = Some(Intent::Cancel);

        let later = manager.get_or_create_at("alice", 2 * HOUR_MS).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &later));
        assert_eq!(later.lock().await.state.last_intent, None);
    }

    #[tokio::test]
    async fn test_activity_extends_lifetime() {
        let manager = SessionManager::new();
        let first = manager.get_or_create_at("alice", 0).await.unwrap();
        manager.get_or_create_at("alice", HOUR_MS - 1).await.unwrap();
        let still = manager.get_or_create_at("alice", 2 * HOUR_MS - 2).await.unwrap();
        assert!(Arc::ptr_eq(&first, &still));
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let manager = SessionManager::new();
        manager.get_or_create_at("old", 0).await.unwrap();
        manager.get_or_create_at("new", 2 * HOUR_MS).await.unwrap();

        assert_eq!(manager.cleanup_expired_at(2 * HOUR_MS + 1).await, 1);
        let ids: Vec<String> = manager.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn test_reset() {
        let manager = SessionManager::new();
        manager.get_or_create("alice").await.unwrap();
        assert!(manager.reset("alice").await);
        assert!(!manager.reset("alice").await);
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let manager = SessionManager::new();
        assert!(manager.get_or_create("").await.is_err());
        assert!(manager.get_or_create("has space").await.is_err());
        assert!(manager.get_or_create(&"x".repeat(200)).await.is_err());
        assert!(manager.get_or_create("web:42_a-b.c").await.is_ok());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = ConversationState::new(10);
        for i in 0..12 {
            state.push_turn(ChatTurn::user(format!("message {}", i)));
        }
        let history = state.history();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "message 2");
        assert_eq!(history[9].content, "message 11");
    }

    #[test]
    fn test_pending_transitions() {
        let mut state = ConversationState::default();
        assert!(!state.waiting_for_slot());

        let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        state.offer_slots(date, Vec::new());
        assert!(state.waiting_for_slot());

        state.await_cancellation(date, Vec::new());
        assert!(!state.waiting_for_slot());
        assert!(matches!(state.pending, Pending::CancellationPending { .. }));

        state.clear_pending();
        assert_eq!(state.pending, Pending::Idle);
    }
}
