use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    AgentMatch, AgentReply, AugmentedPrompt, ChatRequest, ChatResponse, Result, RetrievedDocument,
    WebResult,
};

/// Chat-completion capability of the LLM backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Runs a chat completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request or cannot be reached.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Similarity search over the registered agents.
#[async_trait]
pub trait AgentMatcher: Send + Sync {
    /// Finds the single agent best suited to a task description.
    ///
    /// # Errors
    ///
    /// Returns an error if no agent is registered or the search fails.
    async fn find_best_agent(&self, task_description: &str) -> Result<AgentMatch>;

    /// Finds up to `limit` candidate agents ordered by descending similarity.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying search fails.
    async fn find_top_agents(&self, task_description: &str, limit: usize) -> Result<Vec<AgentMatch>> {
        let best = self.find_best_agent(task_description).await?;
        Ok(vec![best].into_iter().take(limit).collect())
    }
}

/// Execution of a message against a specific agent.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Sends `message` to `agent_id` within an optional conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent is unknown or its execution fails.
    async fn execute(
        &self,
        agent_id: &str,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<AgentReply>;
}

/// Retrieval backend: ranked search and prompt augmentation.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    /// Searches the index for passages scoring at least `min_score`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be queried.
    async fn search(&self, query: &str, top_k: usize, min_score: f64)
    -> Result<Vec<RetrievedDocument>>;

    /// Rewrites `prompt` with the `top_k` most relevant passages.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn augment_prompt(&self, prompt: &str, top_k: usize) -> Result<AugmentedPrompt>;
}

/// NLP backend: summarization and translation.
#[async_trait]
pub trait NlpClient: Send + Sync {
    /// Summarizes `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Translates `text` into `target_language` (ISO 639-1 code).
    ///
    /// # Errors
    ///
    /// Returns an error if the language is unsupported or the backend fails.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Web search backend.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Returns up to `max_results` hits for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search provider fails.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>>;
}

/// The set of backend capabilities available to the routing core.
///
/// Every port is optional; a missing port is the "unavailable" state and each
/// consumer decides whether that is fatal or degrades to a local fallback.
#[derive(Clone, Default)]
pub struct Backends {
    /// LLM chat backend
    pub chat: Option<Arc<dyn ChatClient>>,
    /// Agent similarity search
    pub agent_matcher: Option<Arc<dyn AgentMatcher>>,
    /// Agent execution
    pub agent_executor: Option<Arc<dyn AgentExecutor>>,
    /// Retrieval backend
    pub retrieval: Option<Arc<dyn RetrievalClient>>,
    /// NLP backend
    pub nlp: Option<Arc<dyn NlpClient>>,
    /// Web search backend
    pub web: Option<Arc<dyn WebSearcher>>,
}

impl Backends {
    /// Sets the chat backend.
    #[must_use]
    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Sets the agent matcher.
    #[must_use]
    pub fn with_agent_matcher(mut self, matcher: Arc<dyn AgentMatcher>) -> Self {
        self.agent_matcher = Some(matcher);
        self
    }

    /// Sets the agent executor.
    #[must_use]
    pub fn with_agent_executor(mut self, executor: Arc<dyn AgentExecutor>) -> Self {
        self.agent_executor = Some(executor);
        self
    }

    /// Sets the retrieval backend.
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalClient>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Sets the NLP backend.
    #[must_use]
    pub fn with_nlp(mut self, nlp: Arc<dyn NlpClient>) -> Self {
        self.nlp = Some(nlp);
        self
    }

    /// Sets the web search backend.
    #[must_use]
    pub fn with_web(mut self, web: Arc<dyn WebSearcher>) -> Self {
        self.web = Some(web);
        self
    }
}
