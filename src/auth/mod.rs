//! Authentication for the Petstore API.
//!
//! Provides interchangeable credential strategies:
//! - **None**: requests are sent without credentials
//! - **API Key**: the `api_key` header
//! - **OAuth2**: a bearer token obtained with the client-credentials grant,
//!   cached and refreshed under a lock
//! - **Composite**: several strategies applied to the same request
//!
//! [`StrategySelector`] builds the right one from an [`AuthConfig`].

mod config;
mod env;
mod error;
mod selector;
mod strategy;
mod token;

pub use config::{
    API_KEY_ENV, AUTH_MODE_ENV, AuthConfig, AuthMode, CredentialSource, DEFAULT_TOKEN_URL,
    OAUTH2_CLIENT_ID_ENV, OAUTH2_CLIENT_SECRET_ENV, OAUTH2_SCOPE_ENV, OAUTH2_TOKEN_URL_ENV,
    OAuth2Settings,
};
pub(crate) use env::{env_bool, env_opt};
pub use error::TokenError;
pub use selector::StrategySelector;
pub use strategy::{
    API_KEY_HEADER, ApiKeyStrategy, AuthStrategy, CompositeStrategy, NoneStrategy, OAuth2Strategy,
    StrategyKind,
};
pub use token::{
    AccessToken, ClientCredentialsFetcher, TOKEN_REFRESH_BUFFER_SECS, TokenFetcher, TokenRequest,
};
