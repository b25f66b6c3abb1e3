//! Fetching supporting context for a request.
//!
//! Fetch failures never abort enrichment; each becomes a failed
//! [`EnrichmentStep`] so later stages and callers can see what was attempted.

use cortex_core::{Result as CoreResult, RetrievalClient, WebSearcher};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::types::{EnrichmentStep, EnrichmentType, Strategy};

const RETRIEVAL_SOURCE: &str = "retrieval";
const WEB_SOURCE: &str = "web";

/// Runs the fetchers a strategy asks for.
pub struct EnrichmentCoordinator {
    config: EnrichmentConfig,
    retrieval: Option<Arc<dyn RetrievalClient>>,
    web: Option<Arc<dyn WebSearcher>>,
}

impl EnrichmentCoordinator {
    /// Creates a coordinator; a missing backend skips its enrichment type.
    #[must_use]
    pub fn new(
        config: EnrichmentConfig,
        retrieval: Option<Arc<dyn RetrievalClient>>,
        web: Option<Arc<dyn WebSearcher>>,
    ) -> Self {
        Self {
            config,
            retrieval,
            web,
        }
    }

    /// Fetches every enrichment type `strategy` lists, in order.
    ///
    /// Returns nothing when the strategy does not require enrichment.
    pub async fn enrich(
        &self,
        cancel: &CancellationToken,
        strategy: &Strategy,
        query: &str,
    ) -> Vec<EnrichmentStep> {
        if !strategy.requires_enrichment {
            return Vec::new();
        }

        let mut steps = Vec::with_capacity(strategy.enrichment_types.len());
        for kind in &strategy.enrichment_types {
            let started = Instant::now();
            let step = match kind {
                EnrichmentType::Retrieval => self.fetch_retrieval(cancel, query).await,
                EnrichmentType::Web => self.fetch_web(cancel, query).await,
                EnrichmentType::Context => None,
            };
            if let Some(step) = step {
                if let Some(error) = &step.error {
                    warn!(kind = %step.kind, %error, "enrichment fetch failed");
                } else {
                    debug!(kind = %step.kind, relevance = step.relevance, "enrichment fetched");
                }
                steps.push(step.with_duration_ms(started.elapsed().as_millis() as u64));
            }
        }
        steps
    }

    async fn fetch_retrieval(&self, cancel: &CancellationToken, query: &str) -> Option<EnrichmentStep> {
        let kind = EnrichmentType::Retrieval;
        let Some(client) = &self.retrieval else {
            return Some(EnrichmentStep::failed(
                kind,
                RETRIEVAL_SOURCE,
                "retrieval backend not configured".to_owned(),
            ));
        };

        let deadline = Duration::from_millis(self.config.retrieval_timeout_ms);
        let search = client.search(query, self.config.top_k, self.config.min_score);
        let step = match bounded(cancel, deadline, search).await {
            Ok(documents) if documents.is_empty() => {
                EnrichmentStep::succeeded(kind, RETRIEVAL_SOURCE, String::new(), 0.0)
            }
            Ok(documents) => {
                let relevance =
                    documents.iter().map(|document| document.score).sum::<f64>() / documents.len() as f64;
                let content = documents
                    .iter()
                    .map(|document| match &document.source {
                        Some(source) => format!("[{source}] {}", document.content),
                        None => document.content.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n");
                EnrichmentStep::succeeded(kind, RETRIEVAL_SOURCE, content, relevance)
            }
            Err(error) => EnrichmentStep::failed(kind, RETRIEVAL_SOURCE, error),
        };
        Some(step)
    }

    async fn fetch_web(&self, cancel: &CancellationToken, query: &str) -> Option<EnrichmentStep> {
        let kind = EnrichmentType::Web;
        let Some(client) = &self.web else {
            return Some(EnrichmentStep::failed(
                kind,
                WEB_SOURCE,
                "web search backend not configured".to_owned(),
            ));
        };

        let deadline = Duration::from_millis(self.config.web_timeout_ms);
        let search = client.search(query, self.config.web_max_results);
        let step = match bounded(cancel, deadline, search).await {
            Ok(results) => {
                let relevance = if results.is_empty() {
                    0.0
                } else {
                    self.config.web_relevance
                };
                let content = results
                    .iter()
                    .map(|result| format!("{} ({}): {}", result.title, result.url, result.snippet))
                    .collect::<Vec<_>>()
                    .join("\n");
                EnrichmentStep::succeeded(kind, WEB_SOURCE, content, relevance)
            }
            Err(error) => EnrichmentStep::failed(kind, WEB_SOURCE, error),
        };
        Some(step)
    }
}

/// Awaits `fetch` under `deadline`, giving up early if `cancel` fires.
async fn bounded<T, F>(cancel: &CancellationToken, deadline: Duration, fetch: F) -> Result<T, String>
where
    F: Future<Output = CoreResult<T>>,
{
    tokio::select! {
        () = cancel.cancelled() => Err("cancelled".to_owned()),
        outcome = timeout(deadline, fetch) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err(format!("timed out after {}ms", deadline.as_millis())),
        },
    }
}
