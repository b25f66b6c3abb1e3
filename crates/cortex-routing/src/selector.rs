//! Intent to strategy mapping.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::types::{EnrichmentType, IntentResult, IntentType, Strategy, TargetBackend};

/// Serving parameters for one intent.
struct Profile<'cfg> {
    name: &'static str,
    target: TargetBackend,
    model: &'cfg str,
    temperature: f32,
    max_tokens: u32,
    enrichment: &'static [EnrichmentType],
    agents: &'static [&'static str],
}

/// Builds the strategy for one intent.
///
/// The match is exhaustive so a new intent cannot be added without deciding
/// how it is served.
fn strategy_for(intent: IntentType, models: &ModelConfig) -> Strategy {
    let profile = match intent {
        IntentType::DirectLlm => Profile {
            name: "Direct LLM",
            target: TargetBackend::Chat,
            model: &models.default_model,
            temperature: 0.7,
            max_tokens: 2048,
            enrichment: &[],
            agents: &[],
        },
        IntentType::CodeGeneration => Profile {
            name: "Code Generation",
            target: TargetBackend::Agent,
            model: &models.code_model,
            temperature: 0.2,
            max_tokens: 4096,
            enrichment: &[],
            agents: &["code-assistant"],
        },
        IntentType::CodeAnalysis => Profile {
            name: "Code Analysis",
            target: TargetBackend::Agent,
            model: &models.code_model,
            temperature: 0.2,
            max_tokens: 4096,
            enrichment: &[EnrichmentType::Retrieval],
            agents: &["code-reviewer"],
        },
        IntentType::WebResearch => Profile {
            name: "Web Research",
            target: TargetBackend::Chat,
            model: &models.default_model,
            temperature: 0.3,
            max_tokens: 2048,
            enrichment: &[EnrichmentType::Web],
            agents: &[],
        },
        IntentType::RagQuery => Profile {
            name: "Knowledge Retrieval",
            target: TargetBackend::Retrieval,
            model: &models.default_model,
            temperature: 0.3,
            max_tokens: 2048,
            enrichment: &[],
            agents: &[],
        },
        IntentType::TaskDecomposition => Profile {
            name: "Task Decomposition",
            target: TargetBackend::Agent,
            model: &models.reasoning_model,
            temperature: 0.4,
            max_tokens: 4096,
            enrichment: &[],
            agents: &[],
        },
        IntentType::MultiStep => Profile {
            name: "Multi-Step",
            target: TargetBackend::Agent,
            model: &models.reasoning_model,
            temperature: 0.4,
            max_tokens: 4096,
            enrichment: &[],
            agents: &[],
        },
        IntentType::Summarization => Profile {
            name: "Summarization",
            target: TargetBackend::Nlp,
            model: &models.default_model,
            temperature: 0.3,
            max_tokens: 1024,
            enrichment: &[],
            agents: &[],
        },
        IntentType::Translation => Profile {
            name: "Translation",
            target: TargetBackend::Nlp,
            model: &models.translation_model,
            temperature: 0.1,
            max_tokens: 2048,
            enrichment: &[],
            agents: &[],
        },
        IntentType::Creative => Profile {
            name: "Creative Writing",
            target: TargetBackend::Chat,
            model: &models.creative_model,
            temperature: 0.9,
            max_tokens: 2048,
            enrichment: &[],
            agents: &[],
        },
        IntentType::Factual => Profile {
            name: "Factual Answer",
            target: TargetBackend::Chat,
            model: &models.default_model,
            temperature: 0.2,
            max_tokens: 1024,
            enrichment: &[EnrichmentType::Retrieval],
            agents: &[],
        },
        IntentType::Conversation => Profile {
            name: "Conversation",
            target: TargetBackend::Chat,
            model: &models.default_model,
            temperature: 0.7,
            max_tokens: 512,
            enrichment: &[],
            agents: &[],
        },
    };

    Strategy {
        id: intent.as_str().to_owned(),
        name: profile.name.to_owned(),
        target: profile.target,
        model: profile.model.to_owned(),
        fallback_model: models.fallback_model.clone(),
        temperature: profile.temperature,
        max_tokens: profile.max_tokens,
        requires_enrichment: !profile.enrichment.is_empty(),
        enrichment_types: profile.enrichment.to_vec(),
        agent_ids: profile
            .agents
            .iter()
            .map(|agent| (*agent).to_owned())
            .collect(),
    }
}

/// Resolves the strategy for a request from its intent and caller overrides.
///
/// The table is built once; selections hand out copies.
pub struct StrategySelector {
    by_intent: HashMap<IntentType, Strategy>,
    default_strategy: Strategy,
}

impl StrategySelector {
    /// Builds the intent-to-strategy table.
    #[must_use]
    pub fn new(models: &ModelConfig) -> Self {
        let by_intent = IntentType::ALL
            .into_iter()
            .map(|intent| (intent, strategy_for(intent, models)))
            .collect();
        Self {
            by_intent,
            default_strategy: strategy_for(IntentType::DirectLlm, models),
        }
    }

    /// All strategies, in intent declaration order.
    #[must_use]
    pub fn strategies(&self) -> Vec<&Strategy> {
        IntentType::ALL
            .iter()
            .filter_map(|intent| self.by_intent.get(intent))
            .collect()
    }

    /// Looks a strategy up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Strategy> {
        self.by_intent.values().find(|strategy| strategy.id == id)
    }

    /// Picks a strategy: forced id if it resolves, else the primary intent's,
    /// else direct LLM. A forced model is applied to the returned copy.
    #[must_use]
    pub fn select(
        &self,
        intent: Option<&IntentResult>,
        forced_strategy: Option<&str>,
        forced_model: Option<&str>,
    ) -> Strategy {
        let forced = forced_strategy
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .and_then(|id| {
                let found = self.get(id);
                if found.is_none() {
                    warn!(strategy = id, "forced strategy not found, ignoring");
                }
                found
            });

        let chosen = forced
            .or_else(|| intent.and_then(|result| self.by_intent.get(&result.primary)))
            .unwrap_or(&self.default_strategy);

        let strategy = match forced_model.map(str::trim).filter(|model| !model.is_empty()) {
            Some(model) => chosen.with_model(model),
            None => chosen.clone(),
        };
        debug!(
            strategy = %strategy.id,
            target = %strategy.target,
            model = %strategy.model,
            "strategy selected"
        );
        strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> StrategySelector {
        StrategySelector::new(&ModelConfig::default())
    }

    #[test]
    fn test_every_intent_has_a_strategy() {
        let selector = selector();
        assert_eq!(selector.strategies().len(), IntentType::ALL.len());
        for intent in IntentType::ALL {
            assert!(selector.get(intent.as_str()).is_some());
        }
    }

    #[test]
    fn test_select_by_intent() {
        let intent = IntentResult::new(IntentType::CodeGeneration, 0.9);
        let strategy = selector().select(Some(&intent), None, None);
        assert_eq!(strategy.target, TargetBackend::Agent);
        assert_eq!(strategy.preferred_agent(), Some("code-assistant"));
        assert_eq!(strategy.model, ModelConfig::default().code_model);
    }

    #[test]
    fn test_forced_strategy_wins_when_it_resolves() {
        let intent = IntentResult::new(IntentType::Creative, 0.9);
        let selector = selector();

        let forced = selector.select(Some(&intent), Some("web-research"), None);
        assert_eq!(forced.id, "web-research");
        assert!(forced.requires_enrichment);

        let unknown = selector.select(Some(&intent), Some("nope"), None);
        assert_eq!(unknown.id, "creative");
    }

    #[test]
    fn test_missing_intent_defaults_to_direct_llm() {
        let strategy = selector().select(None, Some("  "), None);
        assert_eq!(strategy.id, "direct-llm");
        assert_eq!(strategy.target, TargetBackend::Chat);
    }

    #[test]
    fn test_forced_model_does_not_touch_table() {
        let selector = selector();
        let intent = IntentResult::new(IntentType::Factual, 0.8);
        let strategy = selector.select(Some(&intent), None, Some("gpt-oss:20b"));
        assert_eq!(strategy.model, "gpt-oss:20b");
        assert_eq!(
            selector.get("factual").map(|table| table.model.as_str()),
            Some(ModelConfig::default().default_model.as_str())
        );
    }
}
