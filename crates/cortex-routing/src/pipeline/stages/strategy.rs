//! Strategy selection stage.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::selector::StrategySelector;
use crate::types::PipelineContext;

/// Resolves the strategy from the intent and the caller's overrides.
pub struct StrategyStage {
    selector: Arc<StrategySelector>,
}

impl StrategyStage {
    /// Wraps a shared selector.
    #[must_use]
    pub fn new(selector: Arc<StrategySelector>) -> Self {
        Self { selector }
    }
}

#[async_trait]
impl PipelineStage for StrategyStage {
    fn name(&self) -> &'static str {
        "strategy"
    }

    fn kind(&self) -> StageKind {
        StageKind::Strategy
    }

    async fn process(&self, _cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let strategy = self.selector.select(
            pctx.intent.as_ref(),
            pctx.options.force_strategy.as_deref(),
            pctx.options.force_model.as_deref(),
        );
        pctx.strategy = Some(strategy);
        Ok(())
    }
}
