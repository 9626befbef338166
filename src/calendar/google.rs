//! Google Calendar v3 provider.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::token::TokenSource;
use super::{CalendarEvent, CalendarProvider, EventTime};
use crate::common::retry::{with_retry, RetryPolicy};
use crate::error::CalendarError;
use crate::types::{BusyInterval, TimeWindow};

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Google Calendar REST client for a single calendar.
pub struct GoogleCalendar {
    client: Client,
    api_base: String,
    calendar_id: String,
    timezone: Tz,
    tokens: Arc<dyn TokenSource>,
    retry: RetryPolicy,
}

impl GoogleCalendar {
    pub fn new(calendar_id: impl Into<String>, timezone: Tz, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
            calendar_id: calendar_id.into(),
            timezone,
            tokens,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the API base URL (for testing).
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CalendarError::InvalidResponse(format!("Bad API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::InvalidResponse("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url, CalendarError> {
        match event_id {
            Some(id) => self.url(&["calendars", self.calendar_id.as_str(), "events", id]),
            None => self.url(&["calendars", self.calendar_id.as_str(), "events"]),
        }
    }

    /// Send an authorized request, retrying transient faults.
    ///
    /// An `insufficientPermissions` rejection forces one token refresh and
    /// a single immediate resend.
    async fn execute<F>(&self, policy: &RetryPolicy, build: F) -> Result<Response, CalendarError>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let build = &build;
        with_retry(policy, || async move {
            let token = self.tokens.access_token().await?;
            match send(build(&token)).await {
                Err(CalendarError::InsufficientPermissions(reason)) => {
                    warn!(%reason, "calendar rejected token scope, refreshing");
                    let token = self.tokens.refresh().await?;
                    send(build(&token)).await
                }
                other => other,
            }
        })
        .await
    }

    fn to_event(&self, raw: GoogleEvent) -> Option<CalendarEvent> {
        if raw.status.as_deref() == Some("cancelled") {
            return None;
        }
        let start = raw.start.parse();
        let end = raw.end.parse();
        let (Some(start), Some(end)) = (start, end) else {
            warn!(event_id = %raw.id, "skipping event with unreadable start or end");
            return None;
        };
        Some(CalendarEvent {
            id: raw.id,
            summary: raw.summary,
            start,
            end,
            html_link: raw.html_link,
            location: raw.location,
            description: raw.description,
        })
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn send(request: RequestBuilder) -> Result<Response, CalendarError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            CalendarError::Timeout
        } else {
            CalendarError::Network(format!("Google API request failed: {}", e))
        }
    })?;
    check_status(response).await
}

async fn check_status(response: Response) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000)
        .unwrap_or(1000);
    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => CalendarError::Unauthorized(error_text),
        StatusCode::FORBIDDEN if error_text.contains("insufficientPermissions") => {
            CalendarError::InsufficientPermissions(error_text)
        }
        StatusCode::FORBIDDEN if error_text.contains("rateLimitExceeded") => {
            CalendarError::RateLimited { retry_after }
        }
        StatusCode::FORBIDDEN => CalendarError::Unauthorized(error_text),
        StatusCode::NOT_FOUND | StatusCode::GONE => CalendarError::NotFound(error_text),
        StatusCode::TOO_MANY_REQUESTS => CalendarError::RateLimited { retry_after },
        s if s.is_server_error() => {
            CalendarError::Unavailable(format!("Google API error ({}): {}", s, error_text))
        }
        s => CalendarError::Api {
            status: s.as_u16(),
            message: error_text,
        },
    })
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    async fn list_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url(None)?;
        let time_min = window.start().to_rfc3339();
        let time_max = window.end().to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", time_min.clone()),
                ("timeMax", time_max.clone()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeZone", self.timezone.name().to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .execute(&self.retry, |token| {
                    self.client.get(url.clone()).bearer_auth(token).query(&query)
                })
                .await?;

            let page: GoogleEventsResponse = response.json().await.map_err(|e| {
                CalendarError::InvalidResponse(format!("Failed to parse Google response: {}", e))
            })?;

            events.extend(page.items.into_iter().filter_map(|raw| self.to_event(raw)));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = events.len(), window = %window, "listed calendar events");
        Ok(events)
    }

    async fn free_busy(&self, window: &TimeWindow) -> Result<Vec<BusyInterval>, CalendarError> {
        let url = self.url(&["freeBusy"])?;
        let body = FreeBusyRequest {
            time_min: window.start().to_rfc3339(),
            time_max: window.end().to_rfc3339(),
            time_zone: self.timezone.name().to_string(),
            items: vec![FreeBusyItem { id: self.calendar_id.clone() }],
        };

        let response = self
            .execute(&self.retry, |token| {
                self.client.post(url.clone()).bearer_auth(token).json(&body)
            })
            .await?;

        let parsed: FreeBusyResponse = response.json().await.map_err(|e| {
            CalendarError::InvalidResponse(format!("Failed to parse free/busy response: {}", e))
        })?;

        let calendar = parsed.calendars.get(&self.calendar_id).ok_or_else(|| {
            CalendarError::InvalidResponse(format!(
                "free/busy response has no entry for {}",
                self.calendar_id
            ))
        })?;

        if let Some(error) = calendar.errors.first() {
            return Err(match error.reason.as_str() {
                "notFound" => CalendarError::NotFound(self.calendar_id.clone()),
                reason => CalendarError::Api {
                    status: 200,
                    message: format!("free/busy error for {}: {}", error.domain, reason),
                },
            });
        }

        let mut busy: Vec<BusyInterval> = calendar
            .busy
            .iter()
            .filter_map(|period| {
                let start = DateTime::parse_from_rfc3339(&period.start).ok()?;
                let end = DateTime::parse_from_rfc3339(&period.end).ok()?;
                TimeWindow::new(start.with_timezone(&self.timezone), end.with_timezone(&self.timezone))
                    .ok()
            })
            .collect();
        busy.sort_by_key(|w| w.start());
        Ok(busy)
    }

    async fn insert_event(
        &self,
        window: &TimeWindow,
        summary: &str,
    ) -> Result<String, CalendarError> {
        let url = self.events_url(None)?;
        let body = NewEvent {
            summary: summary.to_string(),
            start: NewEventTime {
                date_time: window.start().to_rfc3339(),
                time_zone: self.timezone.name().to_string(),
            },
            end: NewEventTime {
                date_time: window.end().to_rfc3339(),
                time_zone: self.timezone.name().to_string(),
            },
            reminders: Reminders { use_default: true },
        };

        // Inserts are not idempotent; a blind resend could double-book.
        let response = self
            .execute(&RetryPolicy::no_retry(), |token| {
                self.client.post(url.clone()).bearer_auth(token).json(&body)
            })
            .await?;

        let created: CreatedEvent = response.json().await.map_err(|e| {
            CalendarError::InvalidResponse(format!("Failed to parse created event: {}", e))
        })?;

        tracing::info!(event_id = %created.id, window = %window, "calendar event created");
        Ok(created.html_link.unwrap_or(created.id))
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let url = self.events_url(Some(event_id))?;
        self.execute(&self.retry, |token| {
            self.client.delete(url.clone()).bearer_auth(token)
        })
        .await?;
        tracing::info!(event_id, "calendar event deleted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
    start: GoogleEventTime,
    end: GoogleEventTime,
}

#[derive(Debug, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl GoogleEventTime {
    fn parse(&self) -> Option<EventTime> {
        if let Some(dt) = &self.date_time {
            return DateTime::parse_from_rfc3339(dt).ok().map(EventTime::DateTime);
        }
        let date = self.date.as_deref()?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(EventTime::Date)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest {
    time_min: String,
    time_max: String,
    time_zone: String,
    items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Serialize)]
struct NewEvent {
    summary: String,
    start: NewEventTime,
    end: NewEventTime,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewEventTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}
