//! Mock backends for testing routing flows.
//!
//! Each mock returns canned data, can be told to fail, and records every call
//! so tests can assert which capabilities were exercised without real services.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    AgentExecutor, AgentMatch, AgentMatcher, AgentReply, AugmentedPrompt, ChatClient, ChatRequest,
    ChatResponse, Error, IgnoreLock as _, NlpClient, Result, RetrievalClient, RetrievedDocument,
    TokenUsage, WebResult, WebSearcher,
};

/// Ordered (pattern, response) pairs; the first pattern contained in the input wins.
type PatternList = Arc<Mutex<Vec<(String, String)>>>;

fn find_pattern(patterns: &PatternList, haystack: &str) -> Option<String> {
    patterns
        .lock_ignore_poison()
        .iter()
        .find(|(pattern, _)| haystack.contains(pattern.as_str()))
        .map(|(_, response)| response.clone())
}

/// Chat backend returning pattern-matched canned replies.
#[derive(Clone, Default)]
pub struct MockChatClient {
    responses: PatternList,
    default_response: Arc<Mutex<Option<String>>>,
    failing_models: Arc<Mutex<HashSet<String>>>,
    fail_all: Arc<AtomicBool>,
    call_history: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChatClient {
    /// Creates a mock that echoes the user message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reply used when any message contains `pattern`.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .lock_ignore_poison()
            .push((pattern.into(), response.into()));
        self
    }

    /// Sets the reply used when no pattern matches.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.lock_ignore_poison() = Some(response.into());
        self
    }

    /// Makes every call for `model` fail with a provider error.
    #[must_use]
    pub fn with_failing_model(self, model: impl Into<String>) -> Self {
        self.failing_models.lock_ignore_poison().insert(model.into());
        self
    }

    /// Makes every call fail with a provider error.
    #[must_use]
    pub fn failing(self) -> Self {
        self.fail_all.store(true, Ordering::SeqCst);
        self
    }

    /// All requests received, in order.
    #[must_use]
    pub fn get_call_history(&self) -> Vec<ChatRequest> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Models requested, in call order.
    #[must_use]
    pub fn models_called(&self) -> Vec<String> {
        self.call_history
            .lock_ignore_poison()
            .iter()
            .map(|request| request.model.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.call_history.lock_ignore_poison().push(request.clone());

        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_models.lock_ignore_poison().contains(&request.model)
        {
            return Err(Error::Provider(format!("model {} unavailable", request.model)));
        }

        let haystack = request
            .messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let user_text = request.last_user_message().unwrap_or_default().to_owned();

        let content = find_pattern(&self.responses, &haystack).unwrap_or_else(|| {
            self.default_response
                .lock_ignore_poison()
                .clone()
                .unwrap_or_else(|| format!("Mock response for: {user_text}"))
        });

        Ok(ChatResponse {
            usage: TokenUsage {
                input: haystack.split_whitespace().count() as u64,
                output: content.split_whitespace().count() as u64,
            },
            content,
            model: request.model,
        })
    }
}

/// A recorded agent execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCall {
    /// Agent invoked
    pub agent_id: String,
    /// Message sent to the agent
    pub message: String,
    /// Conversation the call belonged to
    pub conversation_id: Option<String>,
}

/// Agent backend implementing both matching and execution.
#[derive(Clone)]
pub struct MockAgentBackend {
    agents: Arc<Mutex<Vec<(String, AgentMatch)>>>,
    fallback_match: Arc<Mutex<AgentMatch>>,
    responses: PatternList,
    failing_agents: Arc<Mutex<HashSet<String>>>,
    failing_descriptions: Arc<Mutex<Vec<String>>>,
    transient_failures: Arc<AtomicUsize>,
    match_history: Arc<Mutex<Vec<String>>>,
    execute_history: Arc<Mutex<Vec<AgentCall>>>,
}

impl Default for MockAgentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgentBackend {
    /// Creates a backend whose unmatched descriptions resolve to `general` with similarity 0.5.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: Arc::new(Mutex::new(Vec::new())),
            fallback_match: Arc::new(Mutex::new(AgentMatch {
                agent_id: "general".to_owned(),
                agent_name: "General Assistant".to_owned(),
                similarity: 0.5,
            })),
            responses: Arc::new(Mutex::new(Vec::new())),
            failing_agents: Arc::new(Mutex::new(HashSet::new())),
            failing_descriptions: Arc::new(Mutex::new(Vec::new())),
            transient_failures: Arc::new(AtomicUsize::new(0)),
            match_history: Arc::new(Mutex::new(Vec::new())),
            execute_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers an agent matched when a description contains `keyword`.
    #[must_use]
    pub fn with_agent(
        self,
        keyword: impl Into<String>,
        agent_id: impl Into<String>,
        similarity: f64,
    ) -> Self {
        let agent_id = agent_id.into();
        let entry = AgentMatch {
            agent_name: format!("{agent_id} agent"),
            agent_id,
            similarity,
        };
        self.agents.lock_ignore_poison().push((keyword.into(), entry));
        self
    }

    /// Sets the match returned when no keyword applies.
    #[must_use]
    pub fn with_fallback_match(self, agent_id: impl Into<String>, similarity: f64) -> Self {
        let agent_id = agent_id.into();
        *self.fallback_match.lock_ignore_poison() = AgentMatch {
            agent_name: format!("{agent_id} agent"),
            agent_id,
            similarity,
        };
        self
    }

    /// Adds a reply used when an executed message contains `pattern`.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .lock_ignore_poison()
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes every execution against `agent_id` fail.
    #[must_use]
    pub fn with_failing_agent(self, agent_id: impl Into<String>) -> Self {
        self.failing_agents.lock_ignore_poison().insert(agent_id.into());
        self
    }

    /// Makes every execution whose message contains `pattern` fail.
    #[must_use]
    pub fn with_failing_message(self, pattern: impl Into<String>) -> Self {
        self.failing_descriptions
            .lock_ignore_poison()
            .push(pattern.into());
        self
    }

    /// Makes the next `count` executions fail, whatever the agent or message.
    #[must_use]
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Task descriptions passed to the matcher, in order.
    #[must_use]
    pub fn match_history(&self) -> Vec<String> {
        self.match_history.lock_ignore_poison().clone()
    }

    /// Executions performed, in order.
    #[must_use]
    pub fn execute_history(&self) -> Vec<AgentCall> {
        self.execute_history.lock_ignore_poison().clone()
    }
}

#[async_trait]
impl AgentMatcher for MockAgentBackend {
    async fn find_best_agent(&self, task_description: &str) -> Result<AgentMatch> {
        self.match_history
            .lock_ignore_poison()
            .push(task_description.to_owned());

        let lowered = task_description.to_lowercase();
        let matched = self
            .agents
            .lock_ignore_poison()
            .iter()
            .find(|(keyword, _)| lowered.contains(&keyword.to_lowercase()))
            .map(|(_, entry)| entry.clone());

        Ok(matched.unwrap_or_else(|| self.fallback_match.lock_ignore_poison().clone()))
    }

    async fn find_top_agents(&self, task_description: &str, limit: usize) -> Result<Vec<AgentMatch>> {
        self.match_history
            .lock_ignore_poison()
            .push(task_description.to_owned());

        let lowered = task_description.to_lowercase();
        let mut matches: Vec<AgentMatch> = self
            .agents
            .lock_ignore_poison()
            .iter()
            .filter(|(keyword, _)| lowered.contains(&keyword.to_lowercase()))
            .map(|(_, entry)| entry.clone())
            .collect();
        matches.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl AgentExecutor for MockAgentBackend {
    async fn execute(
        &self,
        agent_id: &str,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<AgentReply> {
        self.execute_history.lock_ignore_poison().push(AgentCall {
            agent_id: agent_id.to_owned(),
            message: message.to_owned(),
            conversation_id: conversation_id.map(str::to_owned),
        });

        let message_fails = self
            .failing_descriptions
            .lock_ignore_poison()
            .iter()
            .any(|pattern| message.contains(pattern.as_str()));
        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
            .is_ok();
        if transient || message_fails || self.failing_agents.lock_ignore_poison().contains(agent_id) {
            return Err(Error::Provider(format!("agent {agent_id} failed")));
        }

        let response = find_pattern(&self.responses, message)
            .unwrap_or_else(|| format!("{agent_id} handled request"));
        Ok(AgentReply {
            total_tokens: message.split_whitespace().count() as u64,
            response,
        })
    }
}

/// Retrieval backend over a fixed document set.
#[derive(Clone, Default)]
pub struct MockRetrievalClient {
    documents: Arc<Mutex<Vec<RetrievedDocument>>>,
    fail: Arc<AtomicBool>,
    search_calls: Arc<Mutex<Vec<String>>>,
    augment_calls: Arc<Mutex<Vec<String>>>,
}

impl MockRetrievalClient {
    /// Creates an empty retrieval backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document returned by every search.
    #[must_use]
    pub fn with_document(self, content: impl Into<String>, score: f64) -> Self {
        let mut documents = self.documents.lock_ignore_poison();
        let source = format!("doc-{}", documents.len() + 1);
        documents.push(RetrievedDocument {
            content: content.into(),
            score,
            source: Some(source),
        });
        drop(documents);
        self
    }

    /// Makes every call fail.
    #[must_use]
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Queries passed to `search`.
    #[must_use]
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock_ignore_poison().clone()
    }

    /// Prompts passed to `augment_prompt`.
    #[must_use]
    pub fn augment_calls(&self) -> Vec<String> {
        self.augment_calls.lock_ignore_poison().clone()
    }

    fn ranked(&self, top_k: usize, min_score: f64) -> Vec<RetrievedDocument> {
        let mut hits: Vec<RetrievedDocument> = self
            .documents
            .lock_ignore_poison()
            .iter()
            .filter(|document| document.score >= min_score)
            .cloned()
            .collect();
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        hits
    }
}

#[async_trait]
impl RetrievalClient for MockRetrievalClient {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<RetrievedDocument>> {
        self.search_calls.lock_ignore_poison().push(query.to_owned());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("retrieval index offline".to_owned()));
        }
        Ok(self.ranked(top_k, min_score))
    }

    async fn augment_prompt(&self, prompt: &str, top_k: usize) -> Result<AugmentedPrompt> {
        self.augment_calls.lock_ignore_poison().push(prompt.to_owned());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("retrieval index offline".to_owned()));
        }

        let hits = self.ranked(top_k, 0.0);
        let context = hits
            .iter()
            .map(|document| document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(AugmentedPrompt {
            prompt: format!("Context:\n{context}\n\nQuestion: {prompt}"),
            sources: hits
                .iter()
                .filter_map(|document| document.source.clone())
                .collect(),
            context_tokens: context.split_whitespace().count() as u64,
        })
    }
}

/// NLP backend with deterministic outputs.
#[derive(Clone, Default)]
pub struct MockNlpClient {
    fail: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockNlpClient {
    /// Creates a working NLP backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail.
    #[must_use]
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Operations performed, formatted as `summarize` or `translate:<lang>`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock_ignore_poison().clone()
    }

    fn record(&self, operation: String) -> Result<()> {
        self.calls.lock_ignore_poison().push(operation);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("nlp service failed".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl NlpClient for MockNlpClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        self.record("summarize".to_owned())?;
        let head: Vec<&str> = text.split_whitespace().take(8).collect();
        Ok(format!("Summary: {}", head.join(" ")))
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.record(format!("translate:{target_language}"))?;
        Ok(format!("[{target_language}] {text}"))
    }
}

/// Web search backend with a fixed result list.
#[derive(Clone, Default)]
pub struct MockWebSearcher {
    results: Arc<Mutex<Vec<WebResult>>>,
    fail: Arc<AtomicBool>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockWebSearcher {
    /// Creates a searcher with no results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hit returned by every search.
    #[must_use]
    pub fn with_result(
        self,
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        self.results.lock_ignore_poison().push(WebResult {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        });
        self
    }

    /// Makes every search fail.
    #[must_use]
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Queries received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock_ignore_poison().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        self.queries.lock_ignore_poison().push(query.to_owned());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ServiceUnavailable("web search".to_owned()));
        }
        Ok(self
            .results
            .lock_ignore_poison()
            .iter()
            .take(max_results)
            .cloned()
            .collect())
    }
}
