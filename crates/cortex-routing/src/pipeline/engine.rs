use cortex_core::{Backends, IgnoreRwLock as _};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stages::{
    EnrichmentStage, IntentStage, QualityStage, RoutingStage, StrategyStage, TranslationStage,
};
use super::{PipelineStage, StreamChunk};
use crate::analyzer::{IntentAnalyzer, Language, TaskDecomposer};
use crate::config::{PipelineConfig, RoutingConfig};
use crate::enrichment::EnrichmentCoordinator;
use crate::error::{Result, RoutingError};
use crate::orchestrator::Orchestrator;
use crate::quality::QualityEvaluator;
use crate::router::Router;
use crate::selector::StrategySelector;
use crate::types::{PipelineContext, RequestOptions};

type Registry = RwLock<HashMap<String, ActiveRequest>>;

/// Registry entry for a request currently executing.
#[derive(Debug)]
struct ActiveRequest {
    started_at: Instant,
    cancelled: Arc<AtomicBool>,
}

/// Snapshot of an active request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStatus {
    /// Id the request was registered under
    pub request_id: String,
    /// Time since the context was created
    pub elapsed: Duration,
    /// Whether cancellation was requested
    pub cancelled: bool,
}

/// Removes its request from the registry when dropped.
struct Registration<'engine> {
    registry: &'engine Registry,
    request_id: String,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry
            .write_ignore_poison()
            .remove(&self.request_id);
    }
}

/// Runs requests through an ordered list of stages.
///
/// Stages run one after another on the calling task. Cancellation, whether
/// through the caller's token or [`PipelineEngine::cancel`], is observed only
/// between stages.
pub struct PipelineEngine {
    stages: Vec<Arc<dyn PipelineStage>>,
    registry: Registry,
    config: PipelineConfig,
}

impl PipelineEngine {
    /// Creates an engine running `stages` in the given order.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn PipelineStage>>, config: PipelineConfig) -> Self {
        let engine = Self {
            stages,
            registry: RwLock::new(HashMap::new()),
            config,
        };
        debug!(stages = ?engine.stage_names(), "pipeline engine created");
        engine
    }

    /// Wires the standard translation, intent, strategy, enrichment, quality
    /// and routing stages over `backends`.
    #[must_use]
    pub fn with_default_stages(config: &RoutingConfig, backends: Backends) -> Self {
        let analyzer = Arc::new(IntentAnalyzer::new(config, backends.chat.clone()));
        let selector = Arc::new(StrategySelector::new(&config.models));
        let coordinator = Arc::new(EnrichmentCoordinator::new(
            config.enrichment.clone(),
            backends.retrieval.clone(),
            backends.web.clone(),
        ));
        let decomposer = TaskDecomposer::new(
            backends.chat.clone().filter(|_| config.intent.use_llm),
            config.models.reasoning_model.clone(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            config.orchestrator.clone(),
            decomposer,
            backends.agent_matcher.clone(),
            backends.agent_executor.clone(),
        ));
        let translator = backends.chat.clone().filter(|_| config.translation.enabled);
        let analysis_language = config
            .translation
            .analysis_language
            .parse()
            .unwrap_or(Language::English);
        let router = Arc::new(Router::new(
            config.router.clone(),
            config.orchestrator.clone(),
            backends,
            Some(orchestrator),
        ));

        let stages: Vec<Arc<dyn PipelineStage>> = vec![
            Arc::new(
                TranslationStage::new(translator, config.models.translation_model.clone())
                    .with_target(analysis_language),
            ),
            Arc::new(IntentStage::new(analyzer)),
            Arc::new(StrategyStage::new(selector)),
            Arc::new(EnrichmentStage::new(
                coordinator,
                config.enrichment.max_iterations,
            )),
            Arc::new(QualityStage::new(QualityEvaluator::new(config.quality.clone()))),
            Arc::new(RoutingStage::new(router)),
        ];
        Self::new(stages, config.pipeline.clone())
    }

    /// Names of the configured stages, in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Builds a context for `prompt` and executes it.
    ///
    /// # Errors
    /// Returns the first stage failure, or a cancellation error.
    pub async fn process(
        &self,
        prompt: &str,
        conversation_id: Option<&str>,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<PipelineContext> {
        let mut pctx = PipelineContext::new(prompt).with_options(options);
        if let Some(conversation_id) = conversation_id {
            pctx = pctx.with_conversation_id(conversation_id);
        }
        self.execute(cancel, &mut pctx).await?;
        Ok(pctx)
    }

    /// Runs every stage against `pctx`.
    ///
    /// Stops without error once a stage sets `blocked`.
    ///
    /// # Errors
    /// Returns a duplicate-request error when a request with the same id is
    /// already running, a cancellation error when cancelled between stages, or
    /// the failing stage's error wrapped as `stage <name> failed`.
    pub async fn execute(&self, cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let _registration = self.register(pctx)?;
        self.run_stages(cancel, pctx, None).await
    }

    /// Like [`Self::execute`], sending a chunk after each stage that produces
    /// one and a terminal `Complete` or `Error` chunk at the end.
    ///
    /// `sender` is consumed, so the channel closes once this returns.
    ///
    /// # Errors
    /// Same as [`Self::execute`]; the error is also sent as the terminal chunk.
    pub async fn execute_stream(
        &self,
        cancel: &CancellationToken,
        mut pctx: PipelineContext,
        sender: Sender<StreamChunk>,
    ) -> Result<PipelineContext> {
        let outcome = match self.register(&pctx) {
            Ok(_registration) => self.run_stages(cancel, &mut pctx, Some(&sender)).await,
            Err(error) => Err(error),
        };

        let request_id = pctx.request_id().to_owned();
        let terminal = match &outcome {
            Ok(()) => StreamChunk::Complete {
                request_id,
                metrics: pctx.metrics.clone(),
            },
            Err(error) => StreamChunk::Error {
                request_id,
                message: error.to_string(),
            },
        };
        if sender.send(terminal).await.is_err() {
            debug!(request_id = %pctx.request_id(), "stream receiver gone before terminal chunk");
        }
        drop(sender);

        outcome.map(|()| pctx)
    }

    /// Spawns streaming execution and returns the receiving end.
    #[must_use]
    pub fn spawn_stream(
        self: &Arc<Self>,
        cancel: CancellationToken,
        pctx: PipelineContext,
    ) -> Receiver<StreamChunk> {
        let (sender, receiver) = mpsc::channel(self.config.stream_buffer.max(1));
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = engine.execute_stream(&cancel, pctx, sender).await {
                debug!(%error, "streamed request ended with an error");
            }
        });
        receiver
    }

    /// Flags an active request as cancelled; it stops at the next stage boundary.
    ///
    /// Returns `false` when no such request is active.
    #[must_use]
    pub fn cancel(&self, request_id: &str) -> bool {
        let registry = self.registry.read_ignore_poison();
        let Some(active) = registry.get(request_id) else {
            return false;
        };
        active.cancelled.store(true, Ordering::SeqCst);
        info!(request_id, "cancellation requested");
        true
    }

    /// Elapsed time and cancellation state of an active request.
    #[must_use]
    pub fn status(&self, request_id: &str) -> Option<RequestStatus> {
        let registry = self.registry.read_ignore_poison();
        registry.get(request_id).map(|active| RequestStatus {
            request_id: request_id.to_owned(),
            elapsed: active.started_at.elapsed(),
            cancelled: active.cancelled.load(Ordering::SeqCst),
        })
    }

    /// Number of requests currently executing.
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.registry.read_ignore_poison().len()
    }

    /// Records `pctx` as active. Ids must be unique among running requests.
    fn register(&self, pctx: &PipelineContext) -> Result<Registration<'_>> {
        let request_id = pctx.request_id().to_owned();
        let mut registry = self.registry.write_ignore_poison();
        if registry.contains_key(&request_id) {
            warn!(request_id, "request id already active, rejecting");
            return Err(RoutingError::DuplicateRequest(request_id));
        }
        registry.insert(
            request_id.clone(),
            ActiveRequest {
                started_at: pctx.started_at(),
                cancelled: pctx.cancel_flag(),
            },
        );
        drop(registry);
        Ok(Registration {
            registry: &self.registry,
            request_id,
        })
    }

    async fn run_stages(
        &self,
        cancel: &CancellationToken,
        pctx: &mut PipelineContext,
        sender: Option<&Sender<StreamChunk>>,
    ) -> Result<()> {
        for stage in &self.stages {
            let name = stage.name();
            if cancel.is_cancelled() || pctx.is_cancelled() {
                pctx.mark_cancelled();
                warn!(request_id = %pctx.request_id(), stage = name, "request cancelled");
                return Err(RoutingError::Cancelled(format!(
                    "request {} cancelled before stage {name}",
                    pctx.request_id()
                )));
            }
            if pctx.blocked {
                debug!(request_id = %pctx.request_id(), stage = name, "request blocked, stopping");
                break;
            }

            let started = Instant::now();
            debug!(request_id = %pctx.request_id(), stage = name, "stage started");
            stage
                .process(cancel, pctx)
                .await
                .map_err(|error| RoutingError::stage(name, error))?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            pctx.metrics
                .stage_durations_ms
                .insert(name.to_owned(), elapsed_ms);
            debug!(request_id = %pctx.request_id(), stage = name, elapsed_ms, "stage finished");

            if let Some(sender) = sender
                && let Some(chunk) = StreamChunk::after_stage(stage.kind(), pctx)
                && sender.send(chunk).await.is_err()
            {
                pctx.mark_cancelled();
                return Err(RoutingError::Cancelled(format!(
                    "stream receiver for request {} dropped",
                    pctx.request_id()
                )));
            }
        }

        pctx.metrics.total_duration_ms = pctx.elapsed().as_millis() as u64;
        Ok(())
    }
}
