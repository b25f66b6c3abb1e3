//! Common fixtures for cortex-routing integration tests
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use cortex_core::mock::{
    MockAgentBackend, MockChatClient, MockNlpClient, MockRetrievalClient, MockWebSearcher,
};
use cortex_core::{
    AgentExecutor, AgentMatcher, Backends, ChatClient, NlpClient, RetrievalClient, WebSearcher,
};
use cortex_routing::{PipelineEngine, RoutingConfig, StreamChunk};
use std::env;
use std::sync::{Arc, Once};
use tokio::sync::mpsc::Receiver;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // tracing already initialized in this process
        }
    });
}

/// Default config with LLM classification off, so intents come from the
/// keyword rules and stay deterministic.
pub fn heuristic_config() -> RoutingConfig {
    let mut config = RoutingConfig::default();
    config.intent.use_llm = false;
    config
}

/// Mock backends shared between the engine and the assertions.
pub struct Fixture {
    /// Chat backend, absent for chat-less runs
    pub chat: Option<Arc<MockChatClient>>,
    /// Agent matcher and executor
    pub agents: Arc<MockAgentBackend>,
    /// Retrieval backend
    pub retrieval: Arc<MockRetrievalClient>,
    /// NLP backend
    pub nlp: Arc<MockNlpClient>,
    /// Web search backend
    pub web: Arc<MockWebSearcher>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            chat: Some(Arc::new(MockChatClient::new())),
            agents: Arc::new(MockAgentBackend::new()),
            retrieval: Arc::new(MockRetrievalClient::new()),
            nlp: Arc::new(MockNlpClient::new()),
            web: Arc::new(MockWebSearcher::new()),
        }
    }
}

impl Fixture {
    /// Replaces the chat mock.
    pub fn with_chat(mut self, chat: MockChatClient) -> Self {
        self.chat = Some(Arc::new(chat));
        self
    }

    /// Removes the chat backend.
    pub fn without_chat(mut self) -> Self {
        self.chat = None;
        self
    }

    /// Replaces the agent mock.
    pub fn with_agents(mut self, agents: MockAgentBackend) -> Self {
        self.agents = Arc::new(agents);
        self
    }

    /// Replaces the retrieval mock.
    pub fn with_retrieval(mut self, retrieval: MockRetrievalClient) -> Self {
        self.retrieval = Arc::new(retrieval);
        self
    }

    /// Replaces the web search mock.
    pub fn with_web(mut self, web: MockWebSearcher) -> Self {
        self.web = Arc::new(web);
        self
    }

    /// The chat mock; panics when the fixture was built without one.
    pub fn chat(&self) -> &MockChatClient {
        self.chat.as_deref().unwrap()
    }

    /// Bundles the mocks as engine backends.
    pub fn backends(&self) -> Backends {
        let mut backends = Backends::default()
            .with_agent_matcher(Arc::clone(&self.agents) as Arc<dyn AgentMatcher>)
            .with_agent_executor(Arc::clone(&self.agents) as Arc<dyn AgentExecutor>)
            .with_retrieval(Arc::clone(&self.retrieval) as Arc<dyn RetrievalClient>)
            .with_nlp(Arc::clone(&self.nlp) as Arc<dyn NlpClient>)
            .with_web(Arc::clone(&self.web) as Arc<dyn WebSearcher>);
        if let Some(chat) = &self.chat {
            backends = backends.with_chat(Arc::clone(chat) as Arc<dyn ChatClient>);
        }
        backends
    }

    /// Engine with the default stages over these mocks.
    pub fn engine(&self, config: &RoutingConfig) -> PipelineEngine {
        init_tracing();
        PipelineEngine::with_default_stages(config, self.backends())
    }
}

/// Drains a stream until the engine closes it.
pub async fn collect_chunks(mut receiver: Receiver<StreamChunk>) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = receiver.recv().await {
        chunks.push(chunk);
    }
    chunks
}
