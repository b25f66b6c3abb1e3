use serde::{Deserialize, Serialize};

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model
    System,
    /// End-user content
    User,
    /// Prior model output
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to run
    pub model: String,
    /// Ordered conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Creates a request with default sampling parameters.
    #[must_use]
    pub fn new<T: Into<String>>(model: T, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the completion token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Text of the last user message, if any.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.as_str())
    }
}

/// Token accounting for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens consumed
    pub input: u64,
    /// Completion tokens produced
    pub output: u64,
}

impl TokenUsage {
    /// Sum of prompt and completion tokens.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    /// Accumulates another usage record into this one.
    pub fn add(&mut self, other: Self) {
        self.input += other.input;
        self.output += other.output;
    }
}

/// A chat completion reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text
    pub content: String,
    /// Model that actually served the call
    pub model: String,
    /// Tokens used
    pub usage: TokenUsage,
}

/// Result of matching a task description against registered agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMatch {
    /// Agent identifier
    pub agent_id: String,
    /// Human-readable agent name
    pub agent_name: String,
    /// Similarity in [0, 1]
    pub similarity: f64,
}

/// Reply produced by an agent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    /// Agent output text
    pub response: String,
    /// Tokens consumed by the agent
    pub total_tokens: u64,
}

/// A ranked retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Retrieved passage
    pub content: String,
    /// Relevance score in [0, 1]
    pub score: f64,
    /// Origin of the passage (document id, path or URL)
    pub source: Option<String>,
}

/// A prompt rewritten with retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentedPrompt {
    /// Prompt including the retrieved context
    pub prompt: String,
    /// Sources the context was drawn from
    pub sources: Vec<String>,
    /// Tokens of context added
    pub context_tokens: u64,
}

/// A single web search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResult {
    /// Page title
    pub title: String,
    /// Page URL
    pub url: String,
    /// Snippet shown by the search engine
    pub snippet: String,
}
