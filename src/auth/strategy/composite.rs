//! Composite strategy applying several strategies to the same request.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthStrategy, StrategyKind};
use crate::Result;
use crate::client::RequestContext;

/// Applies every configured child strategy, in insertion order.
///
/// The configured subset is computed once at construction; reconfiguring a
/// child afterwards is not observed.
#[derive(Debug, Clone, Default)]
pub struct CompositeStrategy {
    strategies: Vec<Arc<dyn AuthStrategy>>,
    configured: Vec<Arc<dyn AuthStrategy>>,
}

impl CompositeStrategy {
    pub fn new(strategies: Vec<Arc<dyn AuthStrategy>>) -> Self {
        let configured = strategies
            .iter()
            .filter(|s| s.is_configured())
            .cloned()
            .collect();
        Self {
            strategies,
            configured,
        }
    }

    /// All children, configured or not.
    pub fn strategies(&self) -> &[Arc<dyn AuthStrategy>] {
        &self.strategies
    }

    /// Type names of the children that will be applied.
    pub fn configured_type_names(&self) -> Vec<&'static str> {
        self.configured.iter().map(|s| s.type_name()).collect()
    }
}

#[async_trait]
impl AuthStrategy for CompositeStrategy {
    async fn apply(&self, ctx: &mut RequestContext) -> Result<()> {
        for strategy in &self.configured {
            strategy.apply(ctx).await?;
        }
        Ok(())
    }

    fn is_configured(&self) -> bool {
        !self.configured.is_empty()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Composite
    }

    fn describe(&self) -> String {
        let children: Vec<String> = self.strategies.iter().map(|s| s.describe()).collect();
        format!("CompositeStrategy([{}])", children.join(", "))
    }
}
