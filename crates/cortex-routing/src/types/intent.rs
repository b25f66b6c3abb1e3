use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Closed set of request intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentType {
    /// Plain model call with no special handling
    DirectLlm,
    /// Writing or modifying code
    CodeGeneration,
    /// Reviewing, explaining or debugging code
    CodeAnalysis,
    /// Needs current information from the web
    WebResearch,
    /// Answerable from the document store
    RagQuery,
    /// Planning or breaking work into steps
    TaskDecomposition,
    /// Condensing a text
    Summarization,
    /// Translating a text
    Translation,
    /// Several requests chained in one prompt
    MultiStep,
    /// Stories, poems and other open-ended writing
    Creative,
    /// Short factual question
    Factual,
    /// Greetings and small talk
    Conversation,
}

impl IntentType {
    /// Every intent, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::DirectLlm,
        Self::CodeGeneration,
        Self::CodeAnalysis,
        Self::WebResearch,
        Self::RagQuery,
        Self::TaskDecomposition,
        Self::Summarization,
        Self::Translation,
        Self::MultiStep,
        Self::Creative,
        Self::Factual,
        Self::Conversation,
    ];

    /// Stable kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectLlm => "direct-llm",
            Self::CodeGeneration => "code-generation",
            Self::CodeAnalysis => "code-analysis",
            Self::WebResearch => "web-research",
            Self::RagQuery => "rag-query",
            Self::TaskDecomposition => "task-decomposition",
            Self::Summarization => "summarization",
            Self::Translation => "translation",
            Self::MultiStep => "multi-step",
            Self::Creative => "creative",
            Self::Factual => "factual",
            Self::Conversation => "conversation",
        }
    }

    /// Whether requests with this intent may be split across several agents.
    #[must_use]
    pub const fn is_decomposable(self) -> bool {
        matches!(self, Self::TaskDecomposition | Self::MultiStep)
    }
}

impl Display for IntentType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = String;

    /// Accepts kebab-case and snake_case labels, case-insensitively.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalized = label.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent: {label}"))
    }
}

/// How demanding a request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    /// One short step
    #[default]
    Simple,
    /// A few steps or some domain knowledge
    Moderate,
    /// Long, multi-part work
    Complex,
    /// Specialist depth required
    Expert,
}

impl ComplexityLevel {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Expert => "expert",
        }
    }
}

impl FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" | "medium" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            "expert" => Ok(Self::Expert),
            other => Err(format!("unknown complexity: {other}")),
        }
    }
}

/// Outcome of classifying a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Intent that decides the strategy
    pub primary: IntentType,
    /// Further intents the prompt also shows
    pub secondary: Vec<IntentType>,
    /// Confidence in the primary intent, within [0, 1]
    pub confidence: f64,
    /// Estimated effort
    pub complexity: ComplexityLevel,
    /// Per-label scores from the classifier
    pub scores: BTreeMap<String, f64>,
    /// Quoted phrases, years and URLs found in the prompt
    pub entities: Vec<String>,
    /// ISO 639-1 code of the prompt language
    pub language: String,
    /// Why the classifier chose this intent
    pub reasoning: String,
}

impl IntentResult {
    /// Creates a result with no secondary intents, scores or entities.
    #[must_use]
    pub fn new(primary: IntentType, confidence: f64) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            complexity: ComplexityLevel::Simple,
            scores: BTreeMap::new(),
            entities: Vec::new(),
            language: "en".to_owned(),
            reasoning: String::new(),
        }
    }

}
