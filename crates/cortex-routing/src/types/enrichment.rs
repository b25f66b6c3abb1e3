use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EnrichmentType;

/// One fetch of supporting context, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentStep {
    /// Unique step id
    pub id: String,
    /// Which fetcher produced the step
    pub kind: EnrichmentType,
    /// Backend the content came from
    pub source: String,
    /// Fetched text, empty on failure
    pub content: String,
    /// Relevance within [0, 1]
    pub relevance: f64,
    /// Whether the fetch succeeded
    pub success: bool,
    /// Fetch error, if any
    pub error: Option<String>,
    /// Time spent fetching
    pub duration_ms: u64,
}

impl EnrichmentStep {
    /// A successful fetch.
    #[must_use]
    pub fn succeeded(kind: EnrichmentType, source: &str, content: String, relevance: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source: source.to_owned(),
            content,
            relevance: relevance.clamp(0.0, 1.0),
            success: true,
            error: None,
            duration_ms: 0,
        }
    }

    /// A failed fetch, recorded instead of aborting enrichment.
    #[must_use]
    pub fn failed(kind: EnrichmentType, source: &str, error: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source: source.to_owned(),
            content: String::new(),
            relevance: 0.0,
            success: false,
            error: Some(error),
            duration_ms: 0,
        }
    }

    /// Sets the fetch duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
