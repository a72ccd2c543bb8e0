//! Authentication strategy trait.

use std::fmt::{self, Debug};

use async_trait::async_trait;

use crate::Result;
use crate::client::RequestContext;

/// Identifies a credential strategy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    None,
    ApiKey,
    OAuth2,
    Composite,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::None => "None",
            StrategyKind::ApiKey => "ApiKey",
            StrategyKind::OAuth2 => "OAuth2",
            StrategyKind::Composite => "Composite",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication strategy interface.
/// Attaches credentials to an outgoing request.
#[async_trait]
pub trait AuthStrategy: Send + Sync + Debug {
    /// Adds this strategy's credentials to the request headers.
    ///
    /// Applying an unconfigured strategy is a no-op.
    async fn apply(&self, ctx: &mut RequestContext) -> Result<()>;

    /// Whether the strategy holds enough material to authenticate.
    fn is_configured(&self) -> bool;

    fn kind(&self) -> StrategyKind;

    /// Stable identifier for logging and diagnostics.
    fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Human-readable description with all secret material masked.
    fn describe(&self) -> String;
}

/// Emits a diagnostic when credentials are about to travel over plain HTTP.
pub(crate) fn warn_if_insecure(ctx: &RequestContext, strategy: &'static str) {
    if !ctx.is_secure() {
        tracing::warn!(
            strategy,
            scheme = ctx.scheme(),
            url = %ctx.url(),
            "Sending credentials over a non-HTTPS connection"
        );
    }
}
