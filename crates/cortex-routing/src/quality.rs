//! Sufficiency scoring of the context gathered for a request.

use tracing::debug;

use crate::config::QualityConfig;
use crate::types::PipelineContext;

const MISSING_INTENT_PENALTY: f64 = 0.2;
const MISSING_ENRICHMENT_PENALTY: f64 = 0.3;
/// Score assumed before penalties when no intent was classified
const BASE_SCORE_WITHOUT_INTENT: f64 = 1.0;

/// Scores how well grounded a request is before it is routed.
///
/// The score is advisory: it is recorded in the pipeline metrics but does not
/// trigger re-enrichment.
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    config: QualityConfig,
}

impl QualityEvaluator {
    /// Creates an evaluator with the given thresholds.
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Returns `(score, sufficient)` with the score clamped to [0, 1].
    #[must_use]
    pub fn evaluate(&self, pctx: &PipelineContext) -> (f64, bool) {
        let mut score = pctx
            .intent
            .as_ref()
            .map_or(BASE_SCORE_WITHOUT_INTENT - MISSING_INTENT_PENALTY, |intent| {
                intent.confidence
            });

        let relevances: Vec<f64> = pctx
            .successful_enrichments()
            .map(|step| step.relevance)
            .collect();
        let requires_enrichment = pctx
            .strategy
            .as_ref()
            .is_some_and(|strategy| strategy.requires_enrichment);

        if pctx.enrichments.is_empty() {
            if requires_enrichment {
                score -= MISSING_ENRICHMENT_PENALTY;
            }
        } else {
            let average = if relevances.is_empty() {
                0.0
            } else {
                relevances.iter().sum::<f64>() / relevances.len() as f64
            };
            score -= (self.config.relevance_threshold - average).max(0.0);
        }

        let score = score.clamp(0.0, 1.0);
        let sufficient = score >= self.config.min_score;
        debug!(score, sufficient, "quality evaluated");
        (score, sufficient)
    }
}
