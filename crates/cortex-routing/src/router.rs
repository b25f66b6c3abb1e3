//! Dispatch of a classified request to its backend.

use cortex_core::{Backends, ChatClient, ChatMessage, ChatRequest, ChatResponse, TokenUsage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{OrchestratorConfig, RouterConfig};
use crate::deadline::with_deadline;
use crate::error::{Result, RoutingError};
use crate::orchestrator::Orchestrator;
use crate::types::{IntentType, PipelineContext, RouteInfo, Strategy, TargetBackend};

/// Context metadata keys written by single-agent routing
pub mod metadata {
    /// Id of the agent that served the request
    pub const AGENT_ID: &str = "agent_id";
    /// Display name of that agent
    pub const AGENT_NAME: &str = "agent_name";
    /// Similarity of the chosen agent, two decimals
    pub const AGENT_CONFIDENCE: &str = "agent_confidence";
    /// One of `forced`, `strategy`, `matched` or `default`
    pub const AGENT_SELECTION: &str = "agent_selection";
    /// Comma-separated ids of the retrieval sources used
    pub const RAG_SOURCES: &str = "rag_sources";
    /// Rough token count of the retrieved context
    pub const RAG_CONTEXT_TOKENS: &str = "rag_context_tokens";
}

/// How the single-agent path picked its agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSelection {
    /// Caller forced the agent
    Forced,
    /// The strategy names a preferred agent
    Strategy,
    /// Similarity search found a confident match
    Matched,
    /// Nothing confident; the configured default agent
    Default,
}

impl AgentSelection {
    /// Value stored under [`metadata::AGENT_SELECTION`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::Strategy => "strategy",
            Self::Matched => "matched",
            Self::Default => "default",
        }
    }
}

/// The agent chosen for a single-agent call.
#[derive(Debug, Clone)]
struct AgentChoice {
    id: String,
    name: String,
    confidence: f64,
    selection: AgentSelection,
}

/// What a dispatch produced, before it is written to the context.
struct Dispatch {
    response: String,
    served_by: String,
    used_fallback: bool,
    orchestrated: bool,
    tokens: TokenUsage,
}

impl Dispatch {
    fn new(response: String, served_by: impl Into<String>) -> Self {
        Self {
            response,
            served_by: served_by.into(),
            used_fallback: false,
            orchestrated: false,
            tokens: TokenUsage::default(),
        }
    }
}

/// Sends requests to the chat, agent, retrieval or NLP backend their strategy targets.
pub struct Router {
    config: RouterConfig,
    orchestrator_config: OrchestratorConfig,
    backends: Backends,
    orchestrator: Option<Arc<Orchestrator>>,
}

impl Router {
    /// Creates a router; `orchestrator` enables multi-agent plans.
    #[must_use]
    pub fn new(
        config: RouterConfig,
        orchestrator_config: OrchestratorConfig,
        backends: Backends,
        orchestrator: Option<Arc<Orchestrator>>,
    ) -> Self {
        Self {
            config,
            orchestrator_config,
            backends,
            orchestrator,
        }
    }

    fn deadline(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    /// Dispatches the request and records the response, route and token usage
    /// on the context.
    ///
    /// # Errors
    /// Fails when no strategy was selected, the target backend is not
    /// configured, or every attempt (fallback model included) failed.
    pub async fn route(&self, cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let strategy = pctx
            .strategy
            .clone()
            .ok_or_else(|| RoutingError::Routing("no strategy selected".to_owned()))?;
        let started = Instant::now();
        info!(
            request_id = %pctx.request_id(),
            target = %strategy.target,
            strategy = %strategy.id,
            "routing request"
        );

        let dispatch = match strategy.target {
            TargetBackend::Chat => {
                let messages = chat_messages(pctx, pctx.prompt());
                self.chat_with_fallback(&strategy, messages).await?
            }
            TargetBackend::Agent => self.route_agent(cancel, pctx, &strategy).await?,
            TargetBackend::Retrieval => self.route_retrieval(pctx, &strategy).await?,
            TargetBackend::Nlp => self.route_nlp(pctx).await?,
        };

        pctx.metrics.tokens.add(dispatch.tokens);
        pctx.response = Some(dispatch.response);
        pctx.route = Some(RouteInfo {
            target: strategy.target,
            served_by: dispatch.served_by,
            used_fallback: dispatch.used_fallback,
            orchestrated: dispatch.orchestrated,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    fn chat_client(&self) -> Result<&Arc<dyn ChatClient>> {
        self.backends
            .chat
            .as_ref()
            .ok_or_else(|| RoutingError::ServiceUnavailable("chat backend not configured".to_owned()))
    }

    async fn chat_once(
        &self,
        chat: &dyn ChatClient,
        strategy: &Strategy,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest::new(model, messages)
            .with_temperature(strategy.temperature)
            .with_max_tokens(strategy.max_tokens);
        with_deadline(self.deadline(), chat.chat(request)).await
    }

    /// Chat on the strategy model, retrying once on the fallback model.
    async fn chat_with_fallback(
        &self,
        strategy: &Strategy,
        messages: Vec<ChatMessage>,
    ) -> Result<Dispatch> {
        let chat = self.chat_client()?;
        let primary_error = match self
            .chat_once(chat.as_ref(), strategy, &strategy.model, messages.clone())
            .await
        {
            Ok(response) => return Ok(chat_dispatch(response, false)),
            Err(error) => error,
        };

        if strategy.fallback_model.is_empty() || strategy.fallback_model == strategy.model {
            return Err(RoutingError::Routing(format!(
                "model {} failed: {primary_error}",
                strategy.model
            )));
        }

        warn!(
            model = %strategy.model,
            fallback = %strategy.fallback_model,
            error = %primary_error,
            "primary model failed, retrying on fallback"
        );
        match self
            .chat_once(chat.as_ref(), strategy, &strategy.fallback_model, messages)
            .await
        {
            Ok(response) => Ok(chat_dispatch(response, true)),
            Err(fallback_error) => Err(RoutingError::Routing(format!(
                "model {} failed: {primary_error}; fallback {} failed: {fallback_error}",
                strategy.model, strategy.fallback_model
            ))),
        }
    }

    fn should_orchestrate(&self, pctx: &PipelineContext) -> bool {
        self.orchestrator_config.enabled
            && self
                .orchestrator
                .as_ref()
                .is_some_and(|orchestrator| orchestrator.is_configured())
            && pctx.options.force_agent.is_none()
            && pctx
                .intent
                .as_ref()
                .is_some_and(|intent| intent.primary.is_decomposable())
    }

    async fn route_agent(
        &self,
        cancel: &CancellationToken,
        pctx: &mut PipelineContext,
        strategy: &Strategy,
    ) -> Result<Dispatch> {
        if let Some(orchestrator) = self.orchestrator.as_ref().filter(|_| self.should_orchestrate(pctx)) {
            let prompt = pctx.prompt().to_owned();
            let conversation_id = pctx.conversation_id.clone();
            match orchestrator
                .process(cancel, &prompt, conversation_id.as_deref())
                .await
            {
                Ok(result) => {
                    info!(
                        tasks = result.plan.tasks.len(),
                        success = result.success,
                        "request orchestrated"
                    );
                    let mut dispatch = Dispatch::new(result.final_output.clone(), "orchestrator");
                    dispatch.orchestrated = true;
                    pctx.orchestration = Some(result);
                    return Ok(dispatch);
                }
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => {
                    warn!(%error, "orchestration failed, falling back to a single agent");
                }
            }
        }

        let executor = self.backends.agent_executor.as_ref().ok_or_else(|| {
            RoutingError::ServiceUnavailable("agent executor not configured".to_owned())
        })?;
        let choice = self.choose_agent(pctx, strategy).await;
        pctx.set_metadata(metadata::AGENT_ID, choice.id.clone());
        pctx.set_metadata(metadata::AGENT_NAME, choice.name.clone());
        pctx.set_metadata(metadata::AGENT_CONFIDENCE, format!("{:.2}", choice.confidence));
        pctx.set_metadata(metadata::AGENT_SELECTION, choice.selection.as_str());
        debug!(
            agent = %choice.id,
            confidence = choice.confidence,
            selection = choice.selection.as_str(),
            "agent selected"
        );

        let call = executor.execute(&choice.id, pctx.prompt(), pctx.conversation_id.as_deref());
        let reply = with_deadline(self.deadline(), call)
            .await
            .map_err(|error| RoutingError::Routing(format!("agent {} failed: {error}", choice.id)))?;

        let mut dispatch = Dispatch::new(reply.response, choice.id);
        dispatch.tokens.output = reply.total_tokens;
        Ok(dispatch)
    }

    /// Forced agent, then the strategy's agent, then a confident match, then the default.
    async fn choose_agent(&self, pctx: &PipelineContext, strategy: &Strategy) -> AgentChoice {
        if let Some(forced) = pctx.options.force_agent.as_deref().filter(|id| !id.is_empty()) {
            return AgentChoice {
                id: forced.to_owned(),
                name: forced.to_owned(),
                confidence: 1.0,
                selection: AgentSelection::Forced,
            };
        }
        if let Some(preferred) = strategy.preferred_agent() {
            return AgentChoice {
                id: preferred.to_owned(),
                name: preferred.to_owned(),
                confidence: 1.0,
                selection: AgentSelection::Strategy,
            };
        }

        let mut similarity = 0.0;
        if let Some(matcher) = &self.backends.agent_matcher {
            match with_deadline(self.deadline(), matcher.find_best_agent(pctx.prompt())).await {
                Ok(found) if found.similarity >= self.orchestrator_config.min_confidence => {
                    return AgentChoice {
                        id: found.agent_id,
                        name: found.agent_name,
                        confidence: found.similarity,
                        selection: AgentSelection::Matched,
                    };
                }
                Ok(found) => similarity = found.similarity,
                Err(error) => warn!(%error, "agent matching failed"),
            }
        }

        let default_agent = &self.orchestrator_config.default_agent_id;
        AgentChoice {
            id: default_agent.clone(),
            name: default_agent.clone(),
            confidence: similarity,
            selection: AgentSelection::Default,
        }
    }

    async fn route_retrieval(&self, pctx: &mut PipelineContext, strategy: &Strategy) -> Result<Dispatch> {
        let retrieval = self.backends.retrieval.as_ref().ok_or_else(|| {
            RoutingError::ServiceUnavailable("retrieval backend not configured".to_owned())
        })?;
        let augmented = with_deadline(
            self.deadline(),
            retrieval.augment_prompt(pctx.prompt(), self.config.rag_top_k),
        )
        .await
        .map_err(|error| RoutingError::Routing(format!("prompt augmentation failed: {error}")))?;

        pctx.set_metadata(metadata::RAG_SOURCES, augmented.sources.join(","));
        pctx.set_metadata(metadata::RAG_CONTEXT_TOKENS, augmented.context_tokens.to_string());

        if self.backends.chat.is_none() {
            debug!("no chat backend, returning the augmented prompt");
            return Ok(Dispatch::new(augmented.prompt, "retrieval"));
        }
        let messages = chat_messages(pctx, &augmented.prompt);
        self.chat_with_fallback(strategy, messages).await
    }

    async fn route_nlp(&self, pctx: &PipelineContext) -> Result<Dispatch> {
        let nlp = self
            .backends
            .nlp
            .as_ref()
            .ok_or_else(|| RoutingError::ServiceUnavailable("nlp backend not configured".to_owned()))?;
        let translate = pctx
            .intent
            .as_ref()
            .is_some_and(|intent| intent.primary == IntentType::Translation);

        let (response, served_by) = if translate {
            let call = nlp.translate(pctx.prompt(), &self.config.target_language);
            (with_deadline(self.deadline(), call).await, "nlp:translate")
        } else {
            (with_deadline(self.deadline(), nlp.summarize(pctx.prompt())).await, "nlp:summarize")
        };
        let response =
            response.map_err(|error| RoutingError::Routing(format!("{served_by} failed: {error}")))?;
        Ok(Dispatch::new(response, served_by))
    }
}

fn chat_dispatch(response: ChatResponse, used_fallback: bool) -> Dispatch {
    Dispatch {
        response: response.content,
        served_by: response.model,
        used_fallback,
        orchestrated: false,
        tokens: response.usage,
    }
}

/// System context from successful enrichments, then the user prompt.
fn chat_messages(pctx: &PipelineContext, user_prompt: &str) -> Vec<ChatMessage> {
    let context = pctx
        .successful_enrichments()
        .filter(|step| !step.content.is_empty())
        .map(|step| format!("[{}]\n{}", step.source, step.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut messages = Vec::with_capacity(2);
    if !context.is_empty() {
        messages.push(ChatMessage::system(format!(
            "Use the following context when it is relevant to the request.\n\n{context}"
        )));
    }
    messages.push(ChatMessage::user(user_prompt));
    messages
}
