//! Keyword heuristics for intent classification.
//!
//! Rules are evaluated in the order of [`HEURISTIC_RULES`]. A `Primary` rule
//! replaces whatever primary intent earlier rules chose (the displaced intent
//! is kept as a secondary), so later rules win. `PrimaryOrSecondary` rules only
//! take the primary slot while it still holds the baseline, otherwise they
//! append a secondary. `Baseline` rules apply only when nothing else matched.
//!
//! Precedence, lowest to highest: code analysis / generation, web research,
//! retrieval, task decomposition, summarization, translation, creative.
//! Multi-step and factual cues are secondary unless nothing stronger matched;
//! conversation only applies to otherwise unclassified prompts.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{ComplexityLevel, IntentResult, IntentType};

/// Confidence of an unclassified prompt
pub const BASELINE_CONFIDENCE: f64 = 0.7;

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#""([^"]{2,80})"|\b((?:19|20)\d{2})\b|(https?://[^\s)]+)"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Entity regex is invalid: {err}"),
    }
});

/// Lower-cased prompt plus the derived signals rules look at.
pub struct PromptFeatures {
    lowered: String,
    words: Vec<String>,
    question_marks: usize,
    current_year: i32,
}

impl PromptFeatures {
    /// Tokenizes `prompt`; `current_year` anchors recency checks.
    #[must_use]
    pub fn new(prompt: &str, current_year: i32) -> Self {
        let lowered = prompt.to_lowercase();
        let words = lowered
            .split(|character: char| !character.is_alphanumeric() && character != '\'')
            .filter(|word| !word.is_empty())
            .map(str::to_owned)
            .collect();
        Self {
            question_marks: lowered.matches('?').count(),
            lowered,
            words,
            current_year,
        }
    }

    /// Whether any phrase occurs as a substring.
    fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| self.lowered.contains(phrase))
    }

    /// Whether any keyword occurs as a whole word.
    fn has_word(&self, keywords: &[&str]) -> bool {
        self.words
            .iter()
            .any(|word| keywords.contains(&word.as_str()))
    }

    /// Number of words in the prompt.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Mentions a year within one year of now.
    fn mentions_recent_year(&self) -> bool {
        let window = (self.current_year - 1)..=(self.current_year + 1);
        self.words
            .iter()
            .filter_map(|word| word.parse::<i32>().ok())
            .any(|year| window.contains(&year))
    }
}

/// What a matching rule does to the result under construction.
#[derive(Debug, Clone, Copy)]
pub enum RuleEffect {
    /// Becomes the primary intent; an earlier primary moves to secondary
    Primary {
        /// Intent to set
        intent: IntentType,
        /// Confidence it carries
        confidence: f64,
    },
    /// Primary if nothing matched yet, otherwise a secondary intent
    PrimaryOrSecondary {
        /// Intent to set or add
        intent: IntentType,
        /// Confidence recorded in the scores
        confidence: f64,
    },
    /// Primary only when no earlier rule matched
    Baseline {
        /// Fallback intent
        intent: IntentType,
        /// Confidence it carries
        confidence: f64,
    },
}

/// A named (predicate, effect) pair.
pub struct HeuristicRule {
    /// Rule name, logged when it fires
    pub name: &'static str,
    /// Whether the rule applies
    pub predicate: fn(&PromptFeatures) -> bool,
    /// What a match does
    pub effect: RuleEffect,
    /// Minimum complexity implied by a match
    pub complexity_floor: Option<ComplexityLevel>,
}

const CODE_WORDS: &[&str] = &[
    "code", "function", "implement", "program", "script", "debug", "compile", "refactor",
    "python", "rust", "javascript", "typescript", "golang", "java", "sql", "regex", "api",
    "class", "method", "bug", "algorithm",
];
const CODE_ANALYSIS_PHRASES: &[&str] = &[
    "review", "analyze this", "analyse this", "what does this", "explain this code", "find the bug",
    "why does this", "optimize",
];
const WEB_PHRASES: &[&str] = &[
    "latest", "news", "current", "today", "recent", "this week", "search the web", "look up",
    "google", "aktuell", "nachrichten", "actualités", "noticias",
];
const RETRIEVAL_PHRASES: &[&str] = &[
    "my documents", "our documents", "knowledge base", "in the docs", "documentation says",
    "according to the", "uploaded", "the attached", "from my notes", "internal wiki",
];
const DECOMPOSITION_PHRASES: &[&str] = &[
    "step by step", "break down", "break it down", "plan for", "create a plan", "roadmap",
    "project plan", "multiple tasks", "workflow",
];
const SUMMARY_PHRASES: &[&str] = &[
    "summarize", "summarise", "summary", "tl;dr", "tldr", "key points", "zusammenfass",
    "résumé", "resumen",
];
const TRANSLATION_PHRASES: &[&str] = &[
    "translate", "translation", "übersetze", "traduire", "traduis", "traducir", "traduce",
    "in english", "into german", "into french", "into spanish",
];
const CREATIVE_PHRASES: &[&str] = &[
    "poem", "story", "song", "lyrics", "haiku", "fiction", "imagine", "creative", "novel",
    "screenplay", "limerick",
];
const MULTI_STEP_PHRASES: &[&str] = &["and then", "after that", "afterwards", "followed by"];
const FACTUAL_PHRASES: &[&str] = &[
    "what is", "what are", "who is", "who was", "when did", "when was", "where is", "how many",
    "define ", "definition of",
];
const GREETING_WORDS: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank", "bye", "morning", "hallo", "bonjour", "hola",
];

fn is_code(features: &PromptFeatures) -> bool {
    features.has_word(CODE_WORDS) || features.lowered.contains("```")
}

/// Ordered heuristic rules; see the module docs for precedence.
pub static HEURISTIC_RULES: &[HeuristicRule] = &[
    HeuristicRule {
        name: "code-analysis",
        predicate: |features| is_code(features) && features.contains_any(CODE_ANALYSIS_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::CodeAnalysis,
            confidence: 0.85,
        },
        complexity_floor: Some(ComplexityLevel::Moderate),
    },
    HeuristicRule {
        name: "code-generation",
        predicate: |features| is_code(features) && !features.contains_any(CODE_ANALYSIS_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::CodeGeneration,
            confidence: 0.85,
        },
        complexity_floor: Some(ComplexityLevel::Moderate),
    },
    HeuristicRule {
        name: "web-research",
        predicate: |features| {
            features.contains_any(WEB_PHRASES) || features.mentions_recent_year()
        },
        effect: RuleEffect::Primary {
            intent: IntentType::WebResearch,
            confidence: 0.8,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "retrieval",
        predicate: |features| features.contains_any(RETRIEVAL_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::RagQuery,
            confidence: 0.8,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "task-decomposition",
        predicate: |features| features.contains_any(DECOMPOSITION_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::TaskDecomposition,
            confidence: 0.75,
        },
        complexity_floor: Some(ComplexityLevel::Complex),
    },
    HeuristicRule {
        name: "summarization",
        predicate: |features| features.contains_any(SUMMARY_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::Summarization,
            confidence: 0.9,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "translation",
        predicate: |features| features.contains_any(TRANSLATION_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::Translation,
            confidence: 0.9,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "creative",
        predicate: |features| features.has_word(CREATIVE_PHRASES),
        effect: RuleEffect::Primary {
            intent: IntentType::Creative,
            confidence: 0.8,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "multi-step",
        predicate: |features| {
            features.question_marks > 1 || features.contains_any(MULTI_STEP_PHRASES)
        },
        effect: RuleEffect::PrimaryOrSecondary {
            intent: IntentType::MultiStep,
            confidence: 0.75,
        },
        complexity_floor: Some(ComplexityLevel::Complex),
    },
    HeuristicRule {
        name: "factual",
        predicate: |features| features.contains_any(FACTUAL_PHRASES),
        effect: RuleEffect::PrimaryOrSecondary {
            intent: IntentType::Factual,
            confidence: 0.75,
        },
        complexity_floor: None,
    },
    HeuristicRule {
        name: "conversation",
        predicate: |features| features.word_count() <= 6 && features.has_word(GREETING_WORDS),
        effect: RuleEffect::Baseline {
            intent: IntentType::Conversation,
            confidence: 0.8,
        },
        complexity_floor: None,
    },
];

fn complexity_for_length(word_count: usize) -> ComplexityLevel {
    match word_count {
        0..=12 => ComplexityLevel::Simple,
        13..=40 => ComplexityLevel::Moderate,
        41..=120 => ComplexityLevel::Complex,
        _ => ComplexityLevel::Expert,
    }
}

fn push_secondary(result: &mut IntentResult, intent: IntentType) {
    if result.primary != intent && !result.secondary.contains(&intent) {
        result.secondary.push(intent);
    }
}

/// Quoted phrases, years near the present and URLs mentioned in the prompt.
#[must_use]
pub fn extract_entities(prompt: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for captures in ENTITY_REGEX.captures_iter(prompt) {
        let matched = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3));
        if let Some(entity) = matched {
            let text = entity.as_str().to_owned();
            if !entities.contains(&text) {
                entities.push(text);
            }
        }
    }
    entities
}

/// Classifies `prompt` with the ordered rule list.
#[must_use]
pub fn classify(prompt: &str, current_year: i32) -> IntentResult {
    let features = PromptFeatures::new(prompt, current_year);
    let mut result = IntentResult::new(IntentType::DirectLlm, BASELINE_CONFIDENCE);
    result.complexity = complexity_for_length(features.word_count());
    let mut matched: Vec<&str> = Vec::new();
    let mut classified = false;

    for rule in HEURISTIC_RULES {
        if !(rule.predicate)(&features) {
            continue;
        }
        match rule.effect {
            RuleEffect::Primary { intent, confidence } => {
                if classified {
                    let displaced = result.primary;
                    push_secondary(&mut result, displaced);
                }
                result.primary = intent;
                result.confidence = confidence;
                result.secondary.retain(|secondary| *secondary != intent);
                result.scores.insert(intent.as_str().to_owned(), confidence);
                classified = true;
            }
            RuleEffect::PrimaryOrSecondary { intent, confidence } => {
                if classified {
                    push_secondary(&mut result, intent);
                } else {
                    result.primary = intent;
                    result.confidence = confidence;
                    classified = true;
                }
                result.scores.insert(intent.as_str().to_owned(), confidence);
            }
            RuleEffect::Baseline { intent, confidence } => {
                if !classified {
                    result.primary = intent;
                    result.confidence = confidence;
                    result.scores.insert(intent.as_str().to_owned(), confidence);
                    classified = true;
                }
            }
        }
        if let Some(floor) = rule.complexity_floor {
            result.complexity = result.complexity.max(floor);
        }
        matched.push(rule.name);
    }

    if !classified {
        result
            .scores
            .insert(IntentType::DirectLlm.as_str().to_owned(), BASELINE_CONFIDENCE);
    }
    result.entities = extract_entities(prompt);
    result.reasoning = if matched.is_empty() {
        "heuristic: no keyword rule matched".to_owned()
    } else {
        format!("heuristic: matched {}", matched.join(", "))
    };
    result
}
