use chrono::{DateTime, Utc};
use cortex_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{EnrichmentStep, IntentResult, OrchestrationResult, Strategy, TargetBackend};

/// Caller overrides for a single request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Model used instead of the strategy's model
    pub force_model: Option<String>,
    /// Strategy id used instead of the intent mapping
    pub force_strategy: Option<String>,
    /// Agent used for agent targets, bypassing matching and orchestration
    pub force_agent: Option<String>,
    /// Skip context fetching even when the strategy asks for it
    pub skip_enrichment: bool,
    /// Analyze the prompt as submitted, without translating it
    pub skip_translation: bool,
}

/// Where and how a request was dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Backend the request went to
    pub target: TargetBackend,
    /// Model or agent that produced the response
    pub served_by: String,
    /// Whether the fallback model answered
    pub used_fallback: bool,
    /// Whether the orchestrator ran a plan
    pub orchestrated: bool,
    /// Time spent in the router
    pub duration_ms: u64,
}

/// Timing and token accounting accumulated across stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Wall time per completed stage, in milliseconds
    pub stage_durations_ms: BTreeMap<String, u64>,
    /// Wall time of the whole run
    pub total_duration_ms: u64,
    /// Tokens consumed by backend calls
    pub tokens: TokenUsage,
    /// Advisory quality score within [0, 1]
    pub quality_score: Option<f64>,
    /// Whether the score met the configured minimum
    pub quality_sufficient: Option<bool>,
    /// Successful enrichment steps
    pub enrichment_count: usize,
}

/// Per-request state threaded through every pipeline stage.
///
/// The original prompt is fixed at construction; translation writes only the
/// separate analysis prompt.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    request_id: String,
    prompt: String,
    /// Conversation the request belongs to
    pub conversation_id: Option<String>,
    /// Free-form annotations written by stages
    pub metadata: BTreeMap<String, String>,
    /// Caller overrides
    pub options: RequestOptions,
    /// Prompt used by analysis stages; English translation when available
    pub prompt_for_analysis: Option<String>,
    /// ISO 639-1 code detected by the translation stage
    pub source_language: Option<String>,
    /// Set by the intent stage
    pub intent: Option<IntentResult>,
    /// Set by the strategy stage
    pub strategy: Option<Strategy>,
    /// Context fetched by the enrichment stage
    pub enrichments: Vec<EnrichmentStep>,
    /// Set by the routing stage
    pub route: Option<RouteInfo>,
    /// Plan outcome when the orchestrator served the request
    pub orchestration: Option<OrchestrationResult>,
    /// Final answer
    pub response: Option<String>,
    /// Timing and token accounting
    pub metrics: PipelineMetrics,
    /// Set by a stage to end the pipeline early without error
    pub blocked: bool,
    cancelled: Arc<AtomicBool>,
    started_at: Instant,
    created_at: DateTime<Utc>,
}

impl PipelineContext {
    /// Creates a context with a fresh request id.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            conversation_id: None,
            metadata: BTreeMap::new(),
            options: RequestOptions::default(),
            prompt_for_analysis: None,
            source_language: None,
            intent: None,
            strategy: None,
            enrichments: Vec::new(),
            route: None,
            orchestration: None,
            response: None,
            metrics: PipelineMetrics::default(),
            blocked: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
            created_at: Utc::now(),
        }
    }

    /// Replaces the generated request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Attaches the request to a conversation.
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Sets caller overrides.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Id used for registry lookups and stream chunks.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The prompt exactly as the caller submitted it.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Translated prompt when one was produced, else the original prompt.
    #[must_use]
    pub fn analysis_prompt(&self) -> &str {
        self.prompt_for_analysis.as_deref().unwrap_or(&self.prompt)
    }

    /// Inserts or replaces a metadata entry.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_owned(), value.into());
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Requests cancellation at the next stage boundary.
    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Handle that lets another task cancel this request.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Monotonic creation time.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Wall-clock creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Successful enrichments, in fetch order.
    pub fn successful_enrichments(&self) -> impl Iterator<Item = &EnrichmentStep> {
        self.enrichments.iter().filter(|step| step.success)
    }
}
