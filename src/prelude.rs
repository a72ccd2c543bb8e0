//! Prelude module for convenient imports.
//!
//! ```rust
//! use petstore_client::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::ErrorKind;
pub use crate::Result;

// Client
pub use crate::client::{Client, ClientBuilder, ClientConfig, ClientConfigBuilder, Response};

// Authentication
pub use crate::auth::{
    ApiKeyStrategy, AuthConfig, AuthMode, AuthStrategy, CompositeStrategy, CredentialSource,
    NoneStrategy, OAuth2Settings, OAuth2Strategy, StrategyKind,
};

// Resource models
pub use crate::types::WireFormat;
