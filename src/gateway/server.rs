//! HTTP server for the schedulai Gateway.
//!
//! Provides the chat endpoint plus direct calendar operations that bypass
//! the conversation: booking, availability suggestions and event listing.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::session::SessionInfo;
use super::{Gateway, DEFAULT_SESSION_ID};
use crate::calendar::CalendarEvent;
use crate::error::{CalendarError, Error, GatewayError};
use crate::types::ExtractedDateTime;

/// Header carrying the session id when the body does not.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared server state.
pub struct ServerState {
    pub gateway: Arc<Gateway>,
    version: String,
}

impl ServerState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
}

/// An open slot as RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub success: bool,
    pub available_slots: Vec<SlotView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsRequest {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<CalendarEvent>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session_count: usize,
    pub calendar: String,
    pub model: String,
}

/// Failure of a direct calendar endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be understood.
    BadRequest(String),
    /// A collaborator failed.
    Upstream(Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::Calendar(CalendarError::InvalidTime(reason)) => ApiError::BadRequest(reason),
            other => ApiError::Upstream(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Upstream(e) => {
                tracing::warn!(error = %e, "calendar request failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Gateway HTTP server.
pub struct GatewayServer {
    state: Arc<ServerState>,
    host: String,
    port: u16,
    cors_enabled: bool,
    sweep_interval: Duration,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(gateway: Arc<Gateway>, host: &str, port: u16) -> Self {
        Self {
            state: Arc::new(ServerState::new(gateway)),
            host: host.to_string(),
            port,
            cors_enabled: true,
            sweep_interval: Duration::from_secs(300),
        }
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Get a reference to the server state.
    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let app = Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/chat", post(Self::chat_handler))
            .route("/sessions", get(Self::sessions_handler))
            .route("/sessions/:id", delete(Self::reset_handler))
            .route("/calendar/book", post(Self::book_handler))
            .route("/calendar/availability", post(Self::availability_handler))
            .route("/calendar/events", post(Self::events_handler))
            .layer(TraceLayer::new_for_http());

        let app = if self.cors_enabled {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        };

        app.with_state(self.state.clone())
    }

    /// Start the server and the expired-session sweep.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::ServerError(format!("Invalid address: {}", e)))?;

        self.spawn_sweeper();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))?;

        tracing::info!("Gateway server listening on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))
    }

    fn spawn_sweeper(&self) {
        let gateway = self.state.gateway.clone();
        let period = self.sweep_interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = gateway.sessions().cleanup_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "expired sessions removed");
                }
            }
        });
    }

    async fn root_handler(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "message": "SchedulAI calendar assistant",
            "version": state.version,
        }))
    }

    /// Health check handler.
    async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
        let negotiator = state.gateway.negotiator();
        Json(HealthResponse {
            status: "ok".to_string(),
            version: state.version.clone(),
            session_count: state.gateway.sessions().count().await,
            calendar: negotiator.calendar_name().to_string(),
            model: negotiator.model_name().to_string(),
        })
    }

    async fn chat_handler(
        State(state): State<Arc<ServerState>>,
        headers: HeaderMap,
        Json(request): Json<ChatRequest>,
    ) -> Json<ChatResponse> {
        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| {
                headers
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

        let response = state.gateway.handle_message(&session_id, &request.message).await;
        Json(ChatResponse { response, session_id })
    }

    /// Sessions list handler.
    async fn sessions_handler(State(state): State<Arc<ServerState>>) -> Json<Vec<SessionInfo>> {
        Json(state.gateway.sessions().list().await)
    }

    async fn reset_handler(
        State(state): State<Arc<ServerState>>,
        Path(id): Path<String>,
    ) -> StatusCode {
        if state.gateway.reset_session(&id).await {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }

    async fn book_handler(
        State(state): State<Arc<ServerState>>,
        Json(request): Json<BookingRequest>,
    ) -> Result<Json<BookingResponse>, ApiError> {
        let parsed = parse_request_date(&state, &format!("{} {}", request.date, request.time));
        let (Some(date), Some(time)) = (parsed.date, parsed.time) else {
            return Err(ApiError::BadRequest("Invalid date/time format".to_string()));
        };

        let booking_url = state
            .gateway
            .negotiator()
            .book_direct(date, time, request.summary.as_deref())
            .await?;
        Ok(Json(BookingResponse { success: true, booking_url }))
    }

    async fn availability_handler(
        State(state): State<Arc<ServerState>>,
        Json(request): Json<AvailabilityRequest>,
    ) -> Result<Json<AvailabilityResponse>, ApiError> {
        let text = match &request.time {
            Some(time) => format!("{} {}", request.date, time),
            None => request.date.clone(),
        };
        let Some(date) = parse_request_date(&state, &text).date else {
            return Err(ApiError::BadRequest("Invalid date/time format".to_string()));
        };

        let slots = state.gateway.negotiator().suggest_slots(date).await?;
        let available_slots = slots
            .iter()
            .map(|slot| SlotView {
                start: slot.start().to_rfc3339(),
                end: slot.end().to_rfc3339(),
            })
            .collect();
        Ok(Json(AvailabilityResponse { success: true, available_slots }))
    }

    async fn events_handler(
        State(state): State<Arc<ServerState>>,
        Json(request): Json<EventsRequest>,
    ) -> Result<Json<EventsResponse>, ApiError> {
        let Some(date) = parse_request_date(&state, &request.date).date else {
            return Err(ApiError::BadRequest("Invalid date format".to_string()));
        };

        let events = state.gateway.negotiator().events_on(date).await?;
        Ok(Json(EventsResponse { success: true, events }))
    }
}

fn parse_request_date(state: &ServerState, text: &str) -> ExtractedDateTime {
    let negotiator = state.gateway.negotiator();
    negotiator.parser().parse(text, negotiator.today())
}
