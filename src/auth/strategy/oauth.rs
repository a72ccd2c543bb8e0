//! OAuth2 client-credentials authentication strategy.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use super::mask::mask_secret;
use super::traits::warn_if_insecure;
use super::{AuthStrategy, StrategyKind};
use crate::auth::config::OAuth2Settings;
use crate::auth::token::{AccessToken, ClientCredentialsFetcher, TokenFetcher, TokenRequest};
use crate::client::{DEFAULT_OPEN_TIMEOUT, DEFAULT_TIMEOUT, RequestContext};
use crate::{Error, Result};

const MIN_CREDENTIAL_LENGTH: usize = 3;
const VISIBLE_PREFIX: usize = 3;

/// OAuth2 authentication strategy.
///
/// Owns the token cache: the stale check, the token-endpoint call and the store
/// run as one critical section, so concurrent callers trigger a single fetch.
pub struct OAuth2Strategy {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    token_url: String,
    scope: Option<String>,
    fetcher: Arc<dyn TokenFetcher>,
    token: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl fmt::Debug for OAuth2Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Strategy")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("token", &self.token_status())
            .finish()
    }
}

impl OAuth2Strategy {
    /// Create from settings. Credentials are trimmed, then validated when both
    /// are present.
    pub fn new(settings: &OAuth2Settings) -> Result<Self> {
        let client_id = non_blank(settings.client_id.as_deref());
        let client_secret = non_blank(settings.client_secret.as_ref().map(|s| s.expose_secret()))
            .map(SecretString::from);

        if let (Some(id), Some(secret)) = (&client_id, &client_secret) {
            validate_credential("client_id", id)?;
            validate_credential("client_secret", secret.expose_secret())?;
        }

        Ok(Self {
            client_id,
            client_secret,
            token_url: settings.token_url_or_default().to_string(),
            scope: non_blank(settings.scope.as_deref()),
            fetcher: Arc::new(ClientCredentialsFetcher::with_timeouts(
                DEFAULT_TIMEOUT,
                DEFAULT_OPEN_TIMEOUT,
            )?),
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Use a custom token endpoint client.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn TokenFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Use the given HTTP client for token requests.
    pub fn with_http(self, http: reqwest::Client) -> Self {
        self.with_fetcher(Arc::new(ClientCredentialsFetcher::new(http)))
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Snapshot of the cached token.
    pub fn cached_token(&self) -> Option<AccessToken> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether the cached token is absent, expired, or about to expire.
    pub fn is_token_stale(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_none_or(AccessToken::needs_refresh)
    }

    /// Fetch a new token and replace the cached one.
    pub async fn fetch_token(&self) -> Result<AccessToken> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Return a usable token, fetching one only when the cache is stale.
    pub async fn ensure_fresh_token(&self) -> Result<AccessToken> {
        let _guard = self.refresh_lock.lock().await;
        match self.cached_token() {
            Some(token) if !token.needs_refresh() => Ok(token),
            _ => self.refresh_locked().await,
        }
    }

    /// Must be called with `refresh_lock` held.
    async fn refresh_locked(&self) -> Result<AccessToken> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(Error::authentication(
                "OAuth2 token fetch failed: client credentials not configured",
            ));
        };

        let request = TokenRequest {
            token_url: &self.token_url,
            client_id,
            client_secret,
            scope: self.scope.as_deref(),
        };

        match self.fetcher.fetch(request).await {
            Ok(token) => {
                tracing::debug!(
                    client_id = %client_id,
                    expires_at = ?token.expires_at(),
                    "OAuth2 token refreshed"
                );
                *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    token_url = %self.token_url,
                    "OAuth2 token fetch failed"
                );
                Err(e.into())
            }
        }
    }

    fn token_status(&self) -> &'static str {
        match self.cached_token() {
            None => "no token",
            Some(token) if token.is_expired() => "token expired",
            Some(_) => "token valid",
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_credential(field: &str, value: &str) -> Result<()> {
    if value.chars().count() < MIN_CREDENTIAL_LENGTH {
        return Err(Error::validation(format!(
            "OAuth2 {} must be at least {} characters long",
            field, MIN_CREDENTIAL_LENGTH
        )));
    }
    if value.contains(['\n', '\r']) {
        return Err(Error::validation(format!(
            "OAuth2 {} cannot contain newline characters",
            field
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthStrategy for OAuth2Strategy {
    async fn apply(&self, ctx: &mut RequestContext) -> Result<()> {
        if !self.is_configured() {
            return Ok(());
        }

        warn_if_insecure(ctx, self.type_name());
        let token = self.ensure_fresh_token().await?;
        ctx.set_sensitive_header(
            AUTHORIZATION,
            &format!("Bearer {}", token.value().expose_secret()),
        )
    }

    fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::OAuth2
    }

    fn describe(&self) -> String {
        let (Some(client_id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return "OAuth2Strategy(not configured)".to_string();
        };
        format!(
            "OAuth2Strategy(client_id: {}, client_secret: {}, {})",
            client_id,
            mask_secret(secret.expose_secret(), VISIBLE_PREFIX),
            self.token_status()
        )
    }
}
