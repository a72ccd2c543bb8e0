//! Client configuration.

use std::sync::RwLock;
use std::time::Duration;

use url::Url;

use super::resilience::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, ExponentialBackoff, RetryPolicy,
};
use crate::auth::{AuthConfig, AuthMode, CredentialSource, OAuth2Settings, env_bool, env_opt};
use crate::{Error, Result};

/// Default Petstore API base URL.
pub const DEFAULT_BASE_URL: &str = "https://petstore.swagger.io/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = concat!("petstore-client/", env!("CARGO_PKG_VERSION"));

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "PETSTORE_BASE_URL";
/// Environment variable toggling retries (`1`/`true` enable).
pub const RETRY_ENABLED_ENV: &str = "PETSTORE_RETRY_ENABLED";

const MAX_BACKOFF: Duration = Duration::from_secs(30);

static GLOBAL: RwLock<Option<ClientConfig>> = RwLock::new(None);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL request paths are resolved against.
    pub base_url: Url,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub open_timeout: Duration,
    pub retry_enabled: bool,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub retry_interval: Duration,
    pub user_agent: String,
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: DEFAULT_TIMEOUT,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            retry_enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("valid default base URL")
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Create configuration from environment.
    ///
    /// Reads the base URL, retry toggle, auth mode and every credential
    /// variable; anything unset keeps its default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            auth: AuthConfig::from_env()?,
            ..Default::default()
        };
        if let Some(url) = env_opt(BASE_URL_ENV) {
            config.base_url = parse_base_url(&url)?;
        }
        if let Some(enabled) = env_bool(RETRY_ENABLED_ENV) {
            config.retry_enabled = enabled;
        }
        Ok(config)
    }

    /// Snapshot of the process-wide default configuration.
    pub fn global() -> ClientConfig {
        GLOBAL
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_default()
    }

    /// Modify the process-wide default configuration.
    ///
    /// `f` edits a copy that is stored once it returns, so it may read
    /// [`ClientConfig::global`]. Clients already built keep their own copy.
    pub fn configure_global(f: impl FnOnce(&mut ClientConfig)) {
        let mut config = Self::global();
        f(&mut config);
        *GLOBAL.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
    }

    /// Restore the process-wide default configuration.
    pub fn reset_global() {
        *GLOBAL.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if !self.retry_enabled {
            return RetryPolicy::disabled();
        }
        RetryPolicy::new(
            self.max_retries,
            ExponentialBackoff::new(self.retry_interval, MAX_BACKOFF, 2.0),
        )
    }

    /// Resolve `path` against the base URL and append `query`.
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        let mut url = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::validation(format!("Invalid request path '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub(crate) fn build_http(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.open_timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::configuration(format!("Invalid base_url '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "Invalid base_url '{}': scheme must be http or https",
            raw
        )));
    }
    Ok(url)
}

/// Builder for [`ClientConfig`].
///
/// Values are checked in [`build`](Self::build) so mistakes surface before
/// any request is attempted.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    open_timeout: Option<Duration>,
    retry_enabled: Option<bool>,
    max_retries: Option<u32>,
    retry_interval: Option<Duration>,
    user_agent: Option<String>,
    auth_mode: Option<AuthMode>,
    auth_mode_name: Option<String>,
    api_key: Option<CredentialSource>,
    oauth2: OAuth2Settings,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    pub fn retry_enabled(mut self, enabled: bool) -> Self {
        self.retry_enabled = Some(enabled);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = Some(mode);
        self.auth_mode_name = None;
        self
    }

    /// Select the auth mode by name (`none`, `api_key`, `oauth2`, `both`).
    ///
    /// Unknown names fail in [`build`](Self::build).
    pub fn auth_mode_name(mut self, name: impl Into<String>) -> Self {
        self.auth_mode_name = Some(name.into());
        self.auth_mode = None;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(CredentialSource::value(key));
        self
    }

    /// Read the API key from the environment when the strategy is built.
    pub fn api_key_from_env(mut self) -> Self {
        self.api_key = Some(CredentialSource::FromEnv);
        self
    }

    pub fn oauth2(mut self, settings: OAuth2Settings) -> Self {
        self.oauth2 = settings;
        self
    }

    pub fn oauth2_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let OAuth2Settings {
            token_url, scope, ..
        } = self.oauth2;
        self.oauth2 = OAuth2Settings {
            token_url,
            scope,
            ..OAuth2Settings::new(client_id, client_secret)
        };
        self
    }

    pub fn oauth2_token_url(mut self, url: impl Into<String>) -> Self {
        self.oauth2.token_url = Some(url.into());
        self
    }

    pub fn oauth2_scope(mut self, scope: impl Into<String>) -> Self {
        self.oauth2.scope = Some(scope.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let base_url = match self.base_url {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.base_url,
        };

        let mode = match (self.auth_mode, self.auth_mode_name) {
            (_, Some(name)) => name.trim().parse()?,
            (Some(mode), None) => mode,
            (None, None) => AuthMode::default(),
        };

        let timeout = self.timeout.unwrap_or(defaults.timeout);
        let open_timeout = self.open_timeout.unwrap_or(defaults.open_timeout);
        if timeout.is_zero() || open_timeout.is_zero() {
            return Err(Error::configuration("Timeouts must be greater than zero"));
        }

        Ok(ClientConfig {
            base_url,
            timeout,
            open_timeout,
            retry_enabled: self.retry_enabled.unwrap_or(defaults.retry_enabled),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_interval: self.retry_interval.unwrap_or(defaults.retry_interval),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            auth: AuthConfig {
                mode,
                api_key: self.api_key,
                oauth2: self.oauth2,
            },
        })
    }
}
