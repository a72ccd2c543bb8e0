//! Strategy that sends requests without credentials.

use async_trait::async_trait;

use super::{AuthStrategy, StrategyKind};
use crate::Result;
use crate::client::RequestContext;

/// No authentication. Never configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneStrategy;

impl NoneStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthStrategy for NoneStrategy {
    async fn apply(&self, _ctx: &mut RequestContext) -> Result<()> {
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::None
    }

    fn describe(&self) -> String {
        "NoneStrategy(no authentication)".to_string()
    }
}
