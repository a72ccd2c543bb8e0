//! Declarative authentication settings.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use super::env::env_opt;
use crate::{Error, Result};

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://petstore.swagger.io/oauth/token";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PETSTORE_API_KEY";
/// Environment variable holding the OAuth2 client id.
pub const OAUTH2_CLIENT_ID_ENV: &str = "PETSTORE_OAUTH2_CLIENT_ID";
/// Environment variable holding the OAuth2 client secret.
pub const OAUTH2_CLIENT_SECRET_ENV: &str = "PETSTORE_OAUTH2_CLIENT_SECRET";
/// Environment variable overriding the OAuth2 token endpoint.
pub const OAUTH2_TOKEN_URL_ENV: &str = "PETSTORE_OAUTH2_TOKEN_URL";
/// Environment variable holding the OAuth2 scope.
pub const OAUTH2_SCOPE_ENV: &str = "PETSTORE_OAUTH2_SCOPE";
/// Environment variable selecting the auth mode.
pub const AUTH_MODE_ENV: &str = "PETSTORE_AUTH_MODE";

/// Which credential strategy the client builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthMode {
    /// Send requests without credentials.
    #[default]
    None,
    /// Send the `api_key` header.
    ApiKey,
    /// Send an OAuth2 bearer token obtained with client credentials.
    OAuth2,
    /// Send both the API key and the bearer token.
    Both,
}

impl AuthMode {
    pub const ALL: [AuthMode; 4] = [
        AuthMode::None,
        AuthMode::ApiKey,
        AuthMode::OAuth2,
        AuthMode::Both,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::ApiKey => "api_key",
            AuthMode::OAuth2 => "oauth2",
            AuthMode::Both => "both",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AuthMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = AuthMode::ALL.iter().map(AuthMode::as_str).collect();
                Error::configuration(format!(
                    "Invalid auth_mode: '{}'. Must be one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Where a secret comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Explicit value.
    Value(SecretString),
    /// Read from the environment when the strategy is built.
    FromEnv,
}

impl CredentialSource {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(SecretString::from(value.into()))
    }

    /// Resolve the secret, reading `env_var` for [`CredentialSource::FromEnv`].
    pub fn resolve(&self, env_var: &str) -> Option<SecretString> {
        match self {
            Self::Value(secret) => Some(secret.clone()),
            Self::FromEnv => env_opt(env_var).map(SecretString::from),
        }
    }
}

/// OAuth2 client-credentials settings.
#[derive(Debug, Clone, Default)]
pub struct OAuth2Settings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Token endpoint; [`DEFAULT_TOKEN_URL`] when unset.
    pub token_url: Option<String>,
    pub scope: Option<String>,
}

impl OAuth2Settings {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(SecretString::from(client_secret.into())),
            token_url: None,
            scope: None,
        }
    }

    /// Load all four settings from their environment variables.
    pub fn from_env() -> Self {
        Self {
            client_id: env_opt(OAUTH2_CLIENT_ID_ENV),
            client_secret: env_opt(OAUTH2_CLIENT_SECRET_ENV).map(SecretString::from),
            token_url: env_opt(OAUTH2_TOKEN_URL_ENV),
            scope: env_opt(OAUTH2_SCOPE_ENV),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Both client id and secret are present and non-blank.
    pub fn has_credentials(&self) -> bool {
        let id = self.client_id.as_deref().is_some_and(|v| !v.trim().is_empty());
        let secret = self
            .client_secret
            .as_ref()
            .is_some_and(|v| !v.expose_secret().trim().is_empty());
        id && secret
    }

    pub fn token_url_or_default(&self) -> &str {
        self.token_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URL)
    }
}

/// Authentication section of the client configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub api_key: Option<CredentialSource>,
    pub oauth2: OAuth2Settings,
}

impl AuthConfig {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Build from environment variables.
    ///
    /// The mode defaults to `none` when [`AUTH_MODE_ENV`] is unset; an invalid
    /// mode name is a configuration error.
    pub fn from_env() -> Result<Self> {
        let mode = match env_opt(AUTH_MODE_ENV) {
            Some(name) => name.trim().parse()?,
            None => AuthMode::None,
        };

        Ok(Self {
            mode,
            api_key: Some(CredentialSource::FromEnv),
            oauth2: OAuth2Settings::from_env(),
        })
    }

    pub fn resolved_api_key(&self) -> Option<SecretString> {
        self.api_key
            .as_ref()
            .and_then(|source| source.resolve(API_KEY_ENV))
    }
}
