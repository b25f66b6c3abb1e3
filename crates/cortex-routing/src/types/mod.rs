//! Data model shared by the analyzer, orchestrator, router and pipeline.

/// Per-request pipeline state
pub mod context;
/// Enrichment step records
pub mod enrichment;
/// Intent classification results
pub mod intent;
/// Execution strategies
pub mod strategy;
/// Tasks, plans and orchestration results
pub mod task;

pub use context::{PipelineContext, PipelineMetrics, RequestOptions, RouteInfo};
pub use enrichment::EnrichmentStep;
pub use intent::{ComplexityLevel, IntentResult, IntentType};
pub use strategy::{EnrichmentType, Strategy, TargetBackend};
pub use task::{
    DecompositionResult, ExecutionPlan, OrchestrationResult, PlannedTask, Task, TaskResult,
};
pub(crate) use task::ensure_unique_ids;
