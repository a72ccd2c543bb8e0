//! Credential strategies for the Petstore API.

mod api_key;
mod composite;
mod mask;
mod none;
mod oauth;
mod traits;

pub use api_key::{API_KEY_HEADER, ApiKeyStrategy};
pub use composite::CompositeStrategy;
pub use none::NoneStrategy;
pub use oauth::OAuth2Strategy;
pub use traits::{AuthStrategy, StrategyKind};
