//! Configuration for intent analysis, enrichment, quality, orchestration, routing and the pipeline.

use crate::error::{Result, RoutingError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete routing configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Model names used by strategies and helper calls
    pub models: ModelConfig,
    /// Intent analysis configuration
    pub intent: IntentConfig,
    /// Prompt translation configuration
    pub translation: TranslationConfig,
    /// Context enrichment configuration
    pub enrichment: EnrichmentConfig,
    /// Quality evaluation configuration
    pub quality: QualityConfig,
    /// Multi-agent orchestration configuration
    pub orchestrator: OrchestratorConfig,
    /// Backend dispatch configuration
    pub router: RouterConfig,
    /// Pipeline engine configuration
    pub pipeline: PipelineConfig,
}

/// Model names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// General-purpose chat model
    pub default_model: String,
    /// Model retried once when the primary model call fails
    pub fallback_model: String,
    /// Model for code generation and analysis
    pub code_model: String,
    /// Model for creative writing
    pub creative_model: String,
    /// Model for multi-step reasoning and planning
    pub reasoning_model: String,
    /// Model used to translate prompts for analysis
    pub translation_model: String,
    /// Model used for intent classification and task decomposition
    pub classifier_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.1:8b".to_owned(),
            fallback_model: "mistral:7b".to_owned(),
            code_model: "qwen2.5-coder:7b".to_owned(),
            creative_model: "llama3.1:8b".to_owned(),
            reasoning_model: "qwen2.5:14b".to_owned(),
            translation_model: "llama3.1:8b".to_owned(),
            classifier_model: "llama3.2:3b".to_owned(),
        }
    }
}

/// Intent analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Whether to classify with the LLM when a chat backend is available
    pub use_llm: bool,
    /// Maximum number of cached classifications
    pub cache_size: usize,
    /// Age after which a cached classification is a miss, in milliseconds
    pub cache_ttl_ms: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            use_llm: true,
            cache_size: 1000,
            cache_ttl_ms: 3_600_000,
        }
    }
}

impl IntentConfig {
    /// Cache TTL as a duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Prompt translation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Whether non-English prompts are translated for analysis
    pub enabled: bool,
    /// ISO 639-1 code of the language analysis stages expect
    pub analysis_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            analysis_language: "en".to_owned(),
        }
    }
}

/// Context enrichment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Upper bound on enrichment passes per request
    pub max_iterations: usize,
    /// Deadline for one retrieval search, in milliseconds
    pub retrieval_timeout_ms: u64,
    /// Deadline for one web search, in milliseconds
    pub web_timeout_ms: u64,
    /// Passages requested from retrieval search
    pub top_k: usize,
    /// Minimum retrieval score
    pub min_score: f64,
    /// Hits requested from web search
    pub web_max_results: usize,
    /// Relevance assigned to a non-empty web result set
    pub web_relevance: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            retrieval_timeout_ms: 5_000,
            web_timeout_ms: 10_000,
            top_k: 5,
            min_score: 0.3,
            web_max_results: 5,
            web_relevance: 0.6,
        }
    }
}

/// Quality evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Score at or above which a request is considered sufficiently grounded
    pub min_score: f64,
    /// Expected average relevance of successful enrichments
    pub relevance_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_score: 0.6,
            relevance_threshold: 0.5,
        }
    }
}

/// Multi-agent orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Whether decomposable prompts are orchestrated across agents
    pub enabled: bool,
    /// Matches below this similarity are reassigned to the default agent
    pub min_confidence: f64,
    /// Agent used when no match is confident enough
    pub default_agent_id: String,
    /// Deadline for one task execution, in milliseconds
    pub task_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.5,
            default_agent_id: "general".to_owned(),
            task_timeout_ms: 120_000,
        }
    }
}

/// Backend dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Deadline for one outbound call, in milliseconds
    pub request_timeout_ms: u64,
    /// Passages used for retrieval-augmented answers
    pub rag_top_k: usize,
    /// Language NLP translation requests translate into
    pub target_language: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
            rag_top_k: 5,
            target_language: "en".to_owned(),
        }
    }
}

/// Pipeline engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the streaming channel
    pub stream_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { stream_buffer: 16 }
    }
}

impl RoutingConfig {
    /// Get the default config directory path (`~/.cortex`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir()
            .ok_or_else(|| RoutingError::Other("Could not determine home directory".to_owned()))?;
        Ok(home.join(".cortex"))
    }

    /// Load config from `~/.cortex/config.toml`, creating it with defaults if missing
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.toml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load and validate config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let header = "# Cortex Routing Configuration\n\
                      # Edit this file to customize models, thresholds and timeouts\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    /// Returns a configuration error naming the first offending setting
    pub fn validate(&self) -> Result<()> {
        let unit_interval = [
            ("quality.min_score", self.quality.min_score),
            ("quality.relevance_threshold", self.quality.relevance_threshold),
            ("orchestrator.min_confidence", self.orchestrator.min_confidence),
            ("enrichment.min_score", self.enrichment.min_score),
            ("enrichment.web_relevance", self.enrichment.web_relevance),
        ];
        for (name, value) in unit_interval {
            if !(0.0..=1.0).contains(&value) {
                return Err(RoutingError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.intent.cache_size == 0 {
            return Err(RoutingError::Configuration(
                "intent.cache_size must be positive".to_owned(),
            ));
        }
        if self.pipeline.stream_buffer == 0 {
            return Err(RoutingError::Configuration(
                "pipeline.stream_buffer must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
