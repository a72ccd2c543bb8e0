//! OAuth2 access tokens and the client-credentials token endpoint.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use super::error::TokenError;
use crate::client::DEFAULT_USER_AGENT;

/// Tokens are refreshed this many seconds before they actually expire.
pub const TOKEN_REFRESH_BUFFER_SECS: i64 = 60;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Bearer token issued by the authorization server.
///
/// Replaced as a whole on refresh, never mutated in place.
#[derive(Clone, Debug)]
pub struct AccessToken {
    value: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_at,
        }
    }

    /// Create from a relative lifetime in seconds, as returned by token endpoints.
    pub fn from_expires_in(value: impl Into<String>, expires_in: Option<i64>) -> Self {
        let expires_at = expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self::new(value, expires_at)
    }

    pub fn value(&self) -> &SecretString {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check if token is expired. Tokens without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Utc::now() >= exp)
            .unwrap_or(false)
    }

    /// Check if token is expired or within the refresh buffer of expiring.
    pub fn needs_refresh(&self) -> bool {
        self.is_expired()
            || self
                .expires_at
                .map(|exp| Utc::now() >= exp - TimeDelta::seconds(TOKEN_REFRESH_BUFFER_SECS))
                .unwrap_or(false)
    }
}

/// Parameters of a client-credentials grant.
#[derive(Debug, Clone, Copy)]
pub struct TokenRequest<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a SecretString,
    pub scope: Option<&'a str>,
}

/// Obtains access tokens from an authorization server.
#[async_trait]
pub trait TokenFetcher: Send + Sync + Debug {
    async fn fetch(&self, request: TokenRequest<'_>) -> Result<AccessToken, TokenError>;
}

/// Fetches tokens with the OAuth2 client-credentials grant over HTTP.
#[derive(Debug, Clone)]
pub struct ClientCredentialsFetcher {
    http: reqwest::Client,
}

impl ClientCredentialsFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetcher whose requests give up after `timeout`.
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                crate::Error::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self::new(http))
    }

    fn encode_form(request: &TokenRequest<'_>) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", "client_credentials");
        form.append_pair("client_id", request.client_id);
        form.append_pair("client_secret", request.client_secret.expose_secret());
        if let Some(scope) = request.scope {
            form.append_pair("scope", scope);
        }
        form.finish()
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[async_trait]
impl TokenFetcher for ClientCredentialsFetcher {
    async fn fetch(&self, request: TokenRequest<'_>) -> Result<AccessToken, TokenError> {
        tracing::debug!(token_url = request.token_url, "Requesting client-credentials token");

        let response = self
            .http
            .post(request.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(Self::encode_form(&request))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(body) = serde_json::from_str::<OAuthErrorBody>(&text) {
                return Err(TokenError::Protocol {
                    error: body.error,
                    description: body.error_description,
                });
            }
            return Err(TokenError::Status {
                status: status.as_u16(),
                body: preview(&text),
            });
        }

        parse_token_response(&text)
    }
}

fn parse_token_response(text: &str) -> Result<AccessToken, TokenError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(TokenError::Protocol {
            error: error.to_string(),
            description: value
                .get("error_description")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TokenError::InvalidResponse("missing access_token".into()))?;

    // Some servers send expires_in as a string.
    let expires_in = match value.get("expires_in") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    Ok(AccessToken::from_expires_in(access_token, expires_in))
}

fn preview(text: &str) -> String {
    if text.chars().count() <= BODY_PREVIEW_LIMIT {
        return text.to_string();
    }
    let truncated: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();
    format!("{}...", truncated)
}
