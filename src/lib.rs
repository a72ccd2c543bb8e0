//! # petstore-client
//!
//! Rust client for the Petstore REST API.
//!
//! The crate focuses on the parts of an API client that are easy to get wrong:
//! pluggable credential strategies (API key, OAuth2 client credentials, both at
//! once), transparent retry with exponential backoff, and a deterministic mapping
//! from HTTP outcomes to a typed [`Error`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use petstore_client::{AuthMode, Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), petstore_client::Error> {
//!     let config = ClientConfig::builder()
//!         .auth_mode(AuthMode::ApiKey)
//!         .api_key("special-key")
//!         .build()?;
//!
//!     let client = Client::new(config)?;
//!     let response = client.get("pet/1", &[]).await?;
//!     println!("{}", response.body());
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Every failure is an [`Error`] whose [`ErrorKind`] tells the caller how to react:
//!
//! ```rust,no_run
//! # use petstore_client::{Client, Error};
//! # async fn run(client: Client) {
//! match client.get("pet/42", &[]).await {
//!     Ok(response) => println!("{}", response.body()),
//!     Err(Error::NotFound { .. }) => println!("no such pet"),
//!     Err(Error::RateLimit { retry_after, .. }) => println!("slow down: {:?}", retry_after),
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod client;
pub mod prelude;
pub mod types;

pub use auth::{
    ApiKeyStrategy, AuthConfig, AuthMode, AuthStrategy, CompositeStrategy, CredentialSource,
    NoneStrategy, OAuth2Settings, OAuth2Strategy, StrategyKind, StrategySelector,
};
pub use client::{
    AuthInterceptor, Client, ClientBuilder, ClientConfig, ClientConfigBuilder, ExponentialBackoff,
    RequestContext, Response, RetryPolicy,
};
pub use types::WireFormat;

/// Error type for petstore-client operations.
///
/// The variant is the error kind; `Display` renders the bare message so callers
/// can surface it unchanged.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input rejected before any network call (e.g. a malformed credential).
    #[error("{message}")]
    Validation { message: String },

    /// Invalid declarative settings (e.g. an unknown auth mode).
    #[error("{message}")]
    Configuration { message: String },

    /// Credential exchange with the authorization server failed.
    #[error("{message}")]
    Authentication { message: String },

    /// The server reported 404.
    #[error("{message}")]
    NotFound { message: String, status: Option<u16> },

    /// The server rejected the request input (400/405).
    #[error("{message}")]
    InvalidInput { message: String, status: Option<u16> },

    /// The server rejected an order (400 with type `InvalidOrder`).
    #[error("{message}")]
    InvalidOrder { message: String, status: Option<u16> },

    /// No response was obtained (connection refused, DNS, timeout).
    #[error("{message}")]
    Connection { message: String },

    /// The server reported 429.
    #[error("{message}")]
    RateLimit {
        message: String,
        status: Option<u16>,
        retry_after: Option<String>,
    },

    /// Any other server-reported failure, or an unexpected error.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
        code: Option<i64>,
        error_type: Option<String>,
    },
}

/// Error kind for differentiated handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Authentication,
    NotFound,
    InvalidInput,
    InvalidOrder,
    Connection,
    RateLimit,
    Generic,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
        }
    }

    /// Generic error without a server status, used for unexpected failures.
    pub fn api(message: impl Into<String>) -> Self {
        Error::Api {
            message: message.into(),
            status: None,
            code: None,
            error_type: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::InvalidOrder { .. } => ErrorKind::InvalidOrder,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::Api { .. } => ErrorKind::Generic,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Validation { message }
            | Error::Configuration { message }
            | Error::Authentication { message }
            | Error::Connection { message }
            | Error::NotFound { message, .. }
            | Error::InvalidInput { message, .. }
            | Error::InvalidOrder { message, .. }
            | Error::RateLimit { message, .. }
            | Error::Api { message, .. } => message,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NotFound { status, .. }
            | Error::InvalidInput { status, .. }
            | Error::InvalidOrder { status, .. }
            | Error::RateLimit { status, .. }
            | Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Raw `Retry-After` header value of a rate-limit error.
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Error::RateLimit { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection { .. } | Error::RateLimit { .. } => true,
            Error::Api {
                status: Some(status),
                ..
            } => (500..=599).contains(status),
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::Authentication { .. }
                | Error::Api {
                    status: Some(401 | 403),
                    ..
                }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::api(format!("Request failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
