//! Context enrichment stage with a bounded re-enrichment loop.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::enrichment::EnrichmentCoordinator;
use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::types::PipelineContext;

/// Fetches supporting context when the strategy asks for it.
///
/// Passes repeat up to `max_iterations` times but stop as soon as any
/// enrichment step, successful or failed, has been recorded.
pub struct EnrichmentStage {
    coordinator: Arc<EnrichmentCoordinator>,
    max_iterations: usize,
}

impl EnrichmentStage {
    /// Creates the stage; a `max_iterations` of zero disables enrichment.
    #[must_use]
    pub fn new(coordinator: Arc<EnrichmentCoordinator>, max_iterations: usize) -> Self {
        Self {
            coordinator,
            max_iterations,
        }
    }
}

#[async_trait]
impl PipelineStage for EnrichmentStage {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    fn kind(&self) -> StageKind {
        StageKind::Enrichment
    }

    async fn process(&self, cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        if pctx.options.skip_enrichment {
            debug!("enrichment skipped by request options");
            return Ok(());
        }
        let Some(strategy) = pctx.strategy.clone().filter(|strategy| strategy.requires_enrichment)
        else {
            return Ok(());
        };

        for iteration in 0..self.max_iterations {
            if !pctx.enrichments.is_empty() {
                break;
            }
            let query = pctx.analysis_prompt().to_owned();
            let steps = self.coordinator.enrich(cancel, &strategy, &query).await;
            debug!(iteration, steps = steps.len(), "enrichment pass");
            pctx.enrichments.extend(steps);
        }
        pctx.metrics.enrichment_count = pctx.enrichments.len();
        Ok(())
    }
}
