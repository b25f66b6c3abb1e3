//! Request routing core: classify a prompt, pick a strategy, fetch context,
//! then dispatch to chat, agent, retrieval or NLP backends.
//!
//! The usual entry point is [`PipelineEngine::with_default_stages`] over a
//! [`cortex_core::Backends`] bundle.

#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Test allows"
    )
)]

pub mod analyzer;
pub mod config;
/// Timeout helper for backend calls
pub mod deadline;
pub mod enrichment;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod quality;
pub mod router;
pub mod selector;
pub mod types;

pub use analyzer::{
    IntentAnalyzer, IntentCache, Language, TaskDecomposer, detect_language, extract_json_object,
};
pub use config::{
    EnrichmentConfig, IntentConfig, ModelConfig, OrchestratorConfig, PipelineConfig,
    QualityConfig, RouterConfig, RoutingConfig, TranslationConfig,
};
pub use enrichment::EnrichmentCoordinator;
pub use error::{Result, RoutingError};
pub use orchestrator::Orchestrator;
pub use pipeline::{
    EnrichmentStage, IntentStage, PipelineEngine, PipelineStage, QualityStage, RequestStatus,
    RoutingStage, StageKind, StrategyStage, StreamChunk, TranslationStage,
};
pub use quality::QualityEvaluator;
pub use router::{AgentSelection, Router};
pub use selector::StrategySelector;
pub use types::{
    ComplexityLevel, DecompositionResult, EnrichmentStep, EnrichmentType, ExecutionPlan,
    IntentResult, IntentType, OrchestrationResult, PipelineContext, PipelineMetrics, PlannedTask,
    RequestOptions, RouteInfo, Strategy, TargetBackend, Task, TaskResult,
};
