//! Pre-routing quality gate.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::quality::QualityEvaluator;
use crate::types::PipelineContext;

/// Records the quality score in the request metrics.
pub struct QualityStage {
    evaluator: QualityEvaluator,
}

impl QualityStage {
    /// Wraps an evaluator.
    #[must_use]
    pub const fn new(evaluator: QualityEvaluator) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl PipelineStage for QualityStage {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn kind(&self) -> StageKind {
        StageKind::Quality
    }

    async fn process(&self, _cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let (score, sufficient) = self.evaluator.evaluate(pctx);
        if !sufficient {
            info!(request_id = %pctx.request_id(), score, "context quality below threshold");
        }
        pctx.metrics.quality_score = Some(score);
        pctx.metrics.quality_sufficient = Some(sufficient);
        Ok(())
    }
}
