use chrono::{Datelike as _, Utc};
use cortex_core::{ChatClient, ChatMessage, ChatRequest};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::IntentCache;
use super::json::extract_json_object;
use super::language::detect_language;
use super::rules::{classify, extract_entities};
use crate::config::RoutingConfig;
use crate::error::{Result, RoutingError};
use crate::types::{ComplexityLevel, IntentResult, IntentType};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You classify user requests for a routing system.\n\
Reply with a single JSON object and nothing else:\n\
{\"primary_intent\": \"<intent>\", \"secondary_intents\": [\"<intent>\"], \
\"confidence\": <0.0-1.0>, \"complexity\": \"simple|moderate|complex|expert\", \
\"entities\": [\"<entity>\"], \"language\": \"<iso 639-1>\", \"reasoning\": \"<one sentence>\"}\n\
Valid intents: direct-llm, code-generation, code-analysis, web-research, rag-query, \
task-decomposition, summarization, translation, multi-step, creative, factual, conversation.";

/// Shape of the classifier's JSON reply.
#[derive(Debug, Deserialize)]
struct ClassifierReply {
    primary_intent: String,
    #[serde(default)]
    secondary_intents: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    complexity: Option<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    reasoning: String,
}

/// Classifies prompts into intents, caching results per normalized prompt.
///
/// With a chat backend and `intent.use_llm` set, classification is delegated
/// to the classifier model; any transport or parse failure falls back to the
/// keyword heuristics in [`super::rules`].
pub struct IntentAnalyzer {
    chat: Option<Arc<dyn ChatClient>>,
    model: String,
    use_llm: bool,
    cache: IntentCache,
}

impl IntentAnalyzer {
    /// Builds an analyzer from the intent and model settings.
    /// Without `chat` only the heuristics run.
    #[must_use]
    pub fn new(config: &RoutingConfig, chat: Option<Arc<dyn ChatClient>>) -> Self {
        Self {
            chat,
            model: config.models.classifier_model.clone(),
            use_llm: config.intent.use_llm,
            cache: IntentCache::new(config.intent.cache_size, config.intent.cache_ttl()),
        }
    }

    /// The analyzer's result cache.
    #[must_use]
    pub fn cache(&self) -> &IntentCache {
        &self.cache
    }

    /// Classifies `prompt`, consulting the cache first.
    pub async fn analyze(&self, prompt: &str, conversation_id: Option<&str>) -> IntentResult {
        let key = IntentCache::key_for(prompt);
        if let Some(cached) = self.cache.get(&key) {
            debug!(intent = %cached.primary, "intent cache hit");
            return cached;
        }
        debug!(conversation_id = ?conversation_id, "intent cache miss");

        let result = match self.classifier() {
            Some(chat) => match self.classify_with_llm(chat.as_ref(), prompt).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "LLM intent classification failed, using heuristics");
                    Self::analyze_heuristic(prompt)
                }
            },
            None => Self::analyze_heuristic(prompt),
        };

        debug!(
            intent = %result.primary,
            confidence = result.confidence,
            complexity = result.complexity.as_str(),
            "intent classified"
        );
        self.cache.insert(key, result.clone());
        result
    }

    /// Keyword-rule classification, independent of any backend.
    #[must_use]
    pub fn analyze_heuristic(prompt: &str) -> IntentResult {
        let mut result = classify(prompt, Utc::now().year());
        result.language = detect_language(prompt).code().to_owned();
        result
    }

    fn classifier(&self) -> Option<&Arc<dyn ChatClient>> {
        self.chat.as_ref().filter(|_| self.use_llm)
    }

    async fn classify_with_llm(&self, chat: &dyn ChatClient, prompt: &str) -> Result<IntentResult> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
        )
        .with_temperature(0.0)
        .with_max_tokens(512);

        let response = chat.chat(request).await?;
        parse_classifier_reply(prompt, &response.content)
    }
}

/// Parses a classifier reply, tolerating prose around the JSON object.
fn parse_classifier_reply(prompt: &str, content: &str) -> Result<IntentResult> {
    let json = extract_json_object(content).ok_or_else(|| {
        RoutingError::Other("classifier reply contains no JSON object".to_owned())
    })?;
    let reply: ClassifierReply = serde_json::from_str(json)?;
    let primary: IntentType = reply.primary_intent.parse().map_err(RoutingError::Other)?;

    let mut result = IntentResult::new(primary, reply.confidence.unwrap_or(0.8));
    result.secondary = reply
        .secondary_intents
        .iter()
        .filter_map(|label| label.parse().ok())
        .filter(|intent| *intent != primary)
        .collect();
    result.complexity = reply
        .complexity
        .as_deref()
        .and_then(|label| label.parse::<ComplexityLevel>().ok())
        .unwrap_or_default();
    result.scores.insert(primary.as_str().to_owned(), result.confidence);
    result.entities = if reply.entities.is_empty() {
        extract_entities(prompt)
    } else {
        reply.entities
    };
    result.language = reply
        .language
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| detect_language(prompt).code().to_owned());
    result.reasoning = reply.reasoning;
    Ok(result)
}
