//! The staged request pipeline.
//!
//! A request flows through translation, intent analysis, strategy selection,
//! enrichment, quality evaluation and routing, each a [`PipelineStage`]
//! mutating the shared [`PipelineContext`] in turn.

/// Stage ordering, registry, cancellation and streaming
pub mod engine;
/// Built-in stages
pub mod stages;
/// Incremental results emitted by streaming execution
pub mod stream;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::PipelineContext;

pub use engine::{PipelineEngine, RequestStatus};
pub use stages::{
    EnrichmentStage, IntentStage, QualityStage, RoutingStage, StrategyStage, TranslationStage,
};
pub use stream::StreamChunk;

/// Role of a stage, used to decide which stream chunk follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Prompt translation
    Translation,
    /// Intent classification
    Intent,
    /// Strategy selection
    Strategy,
    /// Context enrichment
    Enrichment,
    /// Quality gate
    Quality,
    /// Final dispatch
    Routing,
    /// Caller-defined stage; emits no stream chunk
    Custom,
}

/// One step of the pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Name used in logs, metrics and stage failure errors
    fn name(&self) -> &'static str;

    /// Role of the stage; [`StageKind::Custom`] unless overridden
    fn kind(&self) -> StageKind {
        StageKind::Custom
    }

    /// Runs the stage against the request context.
    ///
    /// Setting `pctx.blocked` ends the pipeline after this stage without error.
    ///
    /// # Errors
    ///
    /// An error aborts the pipeline; the engine wraps it in a stage failure
    /// naming this stage.
    async fn process(&self, cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()>;
}
