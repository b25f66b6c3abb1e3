//! Intent classification stage.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::analyzer::IntentAnalyzer;
use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::types::PipelineContext;

/// Classifies the analysis prompt.
pub struct IntentStage {
    analyzer: Arc<IntentAnalyzer>,
}

impl IntentStage {
    /// Wraps a shared analyzer.
    #[must_use]
    pub fn new(analyzer: Arc<IntentAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl PipelineStage for IntentStage {
    fn name(&self) -> &'static str {
        "intent"
    }

    fn kind(&self) -> StageKind {
        StageKind::Intent
    }

    async fn process(&self, _cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let mut intent = self
            .analyzer
            .analyze(pctx.analysis_prompt(), pctx.conversation_id.as_deref())
            .await;
        // The analysis prompt may be a translation; report the caller's language.
        if let Some(language) = &pctx.source_language {
            intent.language.clone_from(language);
        }
        pctx.intent = Some(intent);
        Ok(())
    }
}
