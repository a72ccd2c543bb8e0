//! API Key authentication strategy.

use async_trait::async_trait;
use reqwest::header::HeaderName;
use secrecy::{ExposeSecret, SecretString};

use super::mask::mask_secret;
use super::traits::warn_if_insecure;
use super::{AuthStrategy, StrategyKind};
use crate::client::RequestContext;
use crate::{Error, Result};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "api_key";

const MIN_KEY_LENGTH: usize = 3;
const VISIBLE_PREFIX: usize = 4;

/// API Key authentication strategy.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStrategy {
    key: Option<SecretString>,
}

impl ApiKeyStrategy {
    /// Create a new API Key strategy.
    ///
    /// The stored key is the trimmed input, but validation runs against the
    /// original: surrounding whitespace or embedded line breaks are rejected so
    /// copy/paste mistakes surface immediately. A blank key yields an
    /// unconfigured strategy.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let original = key.as_ref();
        let trimmed = original.trim();

        if trimmed.is_empty() {
            return Ok(Self::unconfigured());
        }
        validate(original, trimmed)?;

        Ok(Self {
            key: Some(SecretString::from(trimmed.to_string())),
        })
    }

    /// Create from an optional key, treating `None` as unconfigured.
    pub fn from_optional(key: Option<&str>) -> Result<Self> {
        match key {
            Some(key) => Self::new(key),
            None => Ok(Self::unconfigured()),
        }
    }

    pub fn unconfigured() -> Self {
        Self { key: None }
    }

    pub fn key(&self) -> Option<&SecretString> {
        self.key.as_ref()
    }
}

fn validate(original: &str, trimmed: &str) -> Result<()> {
    if trimmed.chars().count() < MIN_KEY_LENGTH {
        return Err(Error::validation(format!(
            "API key must be at least {} characters long",
            MIN_KEY_LENGTH
        )));
    }
    if original.contains(['\n', '\r']) {
        return Err(Error::validation(
            "API key cannot contain newline characters",
        ));
    }
    if original != trimmed {
        return Err(Error::validation(
            "API key cannot have leading or trailing whitespace",
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::validation(
            "API key cannot contain control characters",
        ));
    }
    Ok(())
}

#[async_trait]
impl AuthStrategy for ApiKeyStrategy {
    async fn apply(&self, ctx: &mut RequestContext) -> Result<()> {
        let Some(key) = self.key.as_ref() else {
            return Ok(());
        };

        warn_if_insecure(ctx, self.type_name());
        ctx.set_sensitive_header(HeaderName::from_static(API_KEY_HEADER), key.expose_secret())
    }

    fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::ApiKey
    }

    fn describe(&self) -> String {
        match &self.key {
            Some(key) => format!(
                "ApiKeyStrategy(key: {})",
                mask_secret(key.expose_secret(), VISIBLE_PREFIX)
            ),
            None => "ApiKeyStrategy(not configured)".to_string(),
        }
    }
}
