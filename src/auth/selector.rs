//! Builds the credential strategy described by an [`AuthConfig`].

use std::sync::{Arc, RwLock};

use secrecy::ExposeSecret;

use super::config::{AuthConfig, AuthMode};
use super::strategy::{
    ApiKeyStrategy, AuthStrategy, CompositeStrategy, NoneStrategy, OAuth2Strategy,
};
use crate::Result;

/// Chooses and memoizes the active credential strategy.
///
/// The cached strategy is kept until [`StrategySelector::invalidate`] is called;
/// callers must invalidate whenever the auth mode or credentials change.
#[derive(Debug, Default)]
pub struct StrategySelector {
    http: RwLock<Option<reqwest::Client>>,
    cached: RwLock<Option<Arc<dyn AuthStrategy>>>,
}

impl StrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given HTTP client for OAuth2 token requests.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        *self.http.get_mut().unwrap_or_else(|e| e.into_inner()) = Some(http);
        self
    }

    /// Replace the HTTP client used for OAuth2 token requests.
    ///
    /// Only strategies built afterwards use it; pair with
    /// [`invalidate`](Self::invalidate).
    pub fn set_http(&self, http: reqwest::Client) {
        *self.http.write().unwrap_or_else(|e| e.into_inner()) = Some(http);
    }

    /// Return the memoized strategy, building it on first use.
    pub fn select(&self, config: &AuthConfig) -> Result<Arc<dyn AuthStrategy>> {
        if let Some(strategy) = self.cached() {
            return Ok(strategy);
        }

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        if let Some(strategy) = cached.as_ref() {
            return Ok(strategy.clone());
        }

        let strategy = self.build(config)?;
        tracing::debug!(
            mode = %config.mode,
            strategy = strategy.type_name(),
            configured = strategy.is_configured(),
            "Authentication strategy selected"
        );
        *cached = Some(strategy.clone());
        Ok(strategy)
    }

    /// Drop the memoized strategy so the next [`select`](Self::select) rebuilds it.
    pub fn invalidate(&self) {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        if cached.take().is_some() {
            tracing::debug!("Authentication strategy invalidated");
        }
    }

    pub fn cached(&self) -> Option<Arc<dyn AuthStrategy>> {
        self.cached.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Build a strategy without touching the cache.
    ///
    /// Missing credentials downgrade to [`NoneStrategy`] instead of failing.
    pub fn build(&self, config: &AuthConfig) -> Result<Arc<dyn AuthStrategy>> {
        let strategy: Arc<dyn AuthStrategy> = match config.mode {
            AuthMode::None => Arc::new(NoneStrategy::new()),
            AuthMode::ApiKey => match self.api_key_strategy(config)? {
                Some(api_key) => api_key,
                None => Arc::new(NoneStrategy::new()),
            },
            AuthMode::OAuth2 => match self.oauth2_strategy(config)? {
                Some(oauth2) => oauth2,
                None => Arc::new(NoneStrategy::new()),
            },
            AuthMode::Both => {
                let strategies = [self.api_key_strategy(config)?, self.oauth2_strategy(config)?]
                    .into_iter()
                    .flatten()
                    .collect();
                Arc::new(CompositeStrategy::new(strategies))
            }
        };
        Ok(strategy)
    }

    fn api_key_strategy(&self, config: &AuthConfig) -> Result<Option<Arc<dyn AuthStrategy>>> {
        let Some(key) = config.resolved_api_key() else {
            return Ok(None);
        };
        if key.expose_secret().trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(ApiKeyStrategy::new(key.expose_secret())?)))
    }

    fn oauth2_strategy(&self, config: &AuthConfig) -> Result<Option<Arc<dyn AuthStrategy>>> {
        if !config.oauth2.has_credentials() {
            return Ok(None);
        }
        let mut strategy = OAuth2Strategy::new(&config.oauth2)?;
        let http = self.http.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(http) = http {
            strategy = strategy.with_http(http);
        }
        Ok(Some(Arc::new(strategy)))
    }
}
