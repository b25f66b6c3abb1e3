use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Backend a strategy dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetBackend {
    /// Direct LLM chat completion
    Chat,
    /// Capability-specific agent, possibly orchestrated
    Agent,
    /// Retrieval-augmented chat
    Retrieval,
    /// NLP service (summarize, translate)
    Nlp,
}

impl Display for TargetBackend {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Chat => "chat",
            Self::Agent => "agent",
            Self::Retrieval => "retrieval",
            Self::Nlp => "nlp",
        };
        formatter.write_str(label)
    }
}

/// Kind of supporting context fetched before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentType {
    /// Document store search
    Retrieval,
    /// Web search results
    Web,
    /// Reserved for conversation context; currently produces nothing
    Context,
}

impl Display for EnrichmentType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Retrieval => "retrieval",
            Self::Web => "web",
            Self::Context => "context",
        };
        formatter.write_str(label)
    }
}

/// The resolved execution decision for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Stable id, usable as a forced strategy
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Backend the request is dispatched to
    pub target: TargetBackend,
    /// Primary model
    pub model: String,
    /// Model retried once when the primary call fails
    pub fallback_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
    /// Whether context must be fetched before routing
    pub requires_enrichment: bool,
    /// Context sources to fetch, in order
    pub enrichment_types: Vec<EnrichmentType>,
    /// Agents preferred for this strategy, best first
    pub agent_ids: Vec<String>,
}

impl Strategy {
    /// Returns a copy using `model` as the primary model.
    #[must_use]
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_owned(),
            ..self.clone()
        }
    }

    /// First preferred agent, if the strategy names one.
    #[must_use]
    pub fn preferred_agent(&self) -> Option<&str> {
        self.agent_ids.first().map(String::as_str)
    }
}
