//! Access tokens for the Google Calendar API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::CalendarError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for calendar requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String, CalendarError>;

    /// Discard any cached token and obtain a new one.
    async fn refresh(&self) -> Result<String, CalendarError>;
}

/// A fixed access token supplied by the environment.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, CalendarError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, CalendarError> {
        Err(CalendarError::Unauthorized(
            "a static access token cannot be refreshed".to_string(),
        ))
    }
}

/// OAuth client credentials and refresh token.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges a refresh token for short-lived access tokens.
pub struct RefreshingToken {
    client: Client,
    token_url: String,
    credentials: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

impl RefreshingToken {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            client: Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Override the token endpoint (for testing).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn fetch(&self) -> Result<CachedToken, CalendarError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::Network(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                400 | 401 | 403 => CalendarError::Unauthorized(format!(
                    "Token refresh failed ({}): {}",
                    status, error_text
                )),
                code if code >= 500 => CalendarError::Unavailable(error_text),
                code => CalendarError::Api { status: code, message: error_text },
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            CalendarError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        tracing::debug!(?lifetime, "refreshed calendar access token");
        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenSource for RefreshingToken {
    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn refresh(&self) -> Result<String, CalendarError> {
        let mut cached = self.cached.lock().await;
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

/// Pick a token source from whatever credentials are present.
///
/// A refresh token with client credentials wins over a bare access token.
pub fn token_source_from_parts(
    access_token: Option<String>,
    credentials: Option<OAuthCredentials>,
    token_url: &str,
) -> Result<Arc<dyn TokenSource>, CalendarError> {
    if let Some(credentials) = credentials {
        return Ok(Arc::new(RefreshingToken::new(credentials).with_token_url(token_url)));
    }
    match access_token {
        Some(token) if !token.trim().is_empty() => Ok(Arc::new(StaticToken::new(token))),
        _ => Err(CalendarError::Unauthorized(
            "no Google Calendar credentials configured".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh-me".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("abc");
        assert_eq!(source.access_token().await.unwrap(), "abc");
        assert!(source.refresh().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_refresh_grant_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source =
            RefreshingToken::new(credentials()).with_token_url(format!("{}/token", server.uri()));
        assert_eq!(source.access_token().await.unwrap(), "fresh-token");
        assert_eq!(source.access_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let source =
            RefreshingToken::new(credentials()).with_token_url(format!("{}/token", server.uri()));
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, CalendarError::Unauthorized(_)));
    }

    #[test]
    fn test_source_selection() {
        assert!(token_source_from_parts(None, None, GOOGLE_TOKEN_URL).is_err());
        assert!(token_source_from_parts(Some("  ".into()), None, GOOGLE_TOKEN_URL).is_err());
        assert!(token_source_from_parts(Some("tok".into()), None, GOOGLE_TOKEN_URL).is_ok());
        assert!(token_source_from_parts(None, Some(credentials()), GOOGLE_TOKEN_URL).is_ok());
    }
}
