//! Token endpoint error types.

use thiserror::Error;

/// Errors raised while obtaining an OAuth2 access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token endpoint could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint returned an OAuth error response.
    #[error("{error}{}", description.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Protocol {
        /// OAuth `error` code (e.g. `invalid_client`)
        error: String,
        /// OAuth `error_description`
        description: Option<String>,
    },

    /// The token endpoint answered with a non-success status and no OAuth error body.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body preview
        body: String,
    },

    /// The response could not be understood.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

impl From<TokenError> for crate::Error {
    fn from(err: TokenError) -> Self {
        crate::Error::authentication(format!("OAuth2 token fetch failed: {}", err))
    }
}
