//! Built-in pipeline stages, in their default execution order.

pub mod enrichment;
pub mod intent;
pub mod quality;
pub mod routing;
pub mod strategy;
pub mod translation;

pub use enrichment::EnrichmentStage;
pub use intent::IntentStage;
pub use quality::QualityStage;
pub use routing::RoutingStage;
pub use strategy::StrategyStage;
pub use translation::TranslationStage;
