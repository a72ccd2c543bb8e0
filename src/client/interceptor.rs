//! Request-pipeline stage that attaches credentials.

use std::sync::Arc;

use super::request::RequestContext;
use crate::Result;
use crate::auth::AuthStrategy;

/// Applies the active strategy to each outgoing request.
///
/// Unconfigured strategies are skipped here even though every built-in
/// strategy also treats `apply` as a no-op when unconfigured.
#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    strategy: Arc<dyn AuthStrategy>,
}

impl AuthInterceptor {
    pub fn new(strategy: Arc<dyn AuthStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &Arc<dyn AuthStrategy> {
        &self.strategy
    }

    pub async fn intercept(&self, ctx: &mut RequestContext) -> Result<()> {
        if !self.strategy.is_configured() {
            tracing::trace!(strategy = self.strategy.type_name(), "Skipping unconfigured strategy");
            return Ok(());
        }
        self.strategy.apply(ctx).await
    }
}
