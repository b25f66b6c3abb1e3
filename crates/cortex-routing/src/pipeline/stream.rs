use serde::Serialize;

use super::StageKind;
use crate::types::{
    EnrichmentStep, IntentResult, PipelineContext, PipelineMetrics, RouteInfo, Strategy,
};

/// An incremental result of streaming execution.
///
/// Exactly one terminal chunk ([`StreamChunk::Complete`] or
/// [`StreamChunk::Error`]) is sent, after which the channel closes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Intent classification finished
    Intent {
        /// Request the chunk belongs to
        request_id: String,
        /// Classified intent
        intent: IntentResult,
    },
    /// A strategy was selected
    Strategy {
        /// Request the chunk belongs to
        request_id: String,
        /// Selected strategy
        strategy: Strategy,
    },
    /// Enrichment ran; sent even when no step was recorded
    Enrichment {
        /// Request the chunk belongs to
        request_id: String,
        /// Steps recorded so far
        steps: Vec<EnrichmentStep>,
    },
    /// Routing produced a response
    Response {
        /// Request the chunk belongs to
        request_id: String,
        /// Response text
        content: String,
        /// Where the request was served
        route: Option<RouteInfo>,
    },
    /// Terminal chunk for a successful run
    Complete {
        /// Request the chunk belongs to
        request_id: String,
        /// Final metrics
        metrics: PipelineMetrics,
    },
    /// Terminal chunk for a failed or cancelled run
    Error {
        /// Request the chunk belongs to
        request_id: String,
        /// Rendered error
        message: String,
    },
}

impl StreamChunk {
    /// The chunk a stage of `kind` emits for the current context, if any.
    #[must_use]
    pub fn after_stage(kind: StageKind, pctx: &PipelineContext) -> Option<Self> {
        let request_id = pctx.request_id().to_owned();
        match kind {
            StageKind::Intent => pctx.intent.clone().map(|intent| Self::Intent { request_id, intent }),
            StageKind::Strategy => pctx
                .strategy
                .clone()
                .map(|strategy| Self::Strategy { request_id, strategy }),
            StageKind::Enrichment => Some(Self::Enrichment {
                request_id,
                steps: pctx.enrichments.clone(),
            }),
            StageKind::Routing => pctx.response.clone().map(|content| Self::Response {
                request_id,
                content,
                route: pctx.route.clone(),
            }),
            StageKind::Translation | StageKind::Quality | StageKind::Custom => None,
        }
    }

    /// Whether this chunk ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntentType;

    #[test]
    fn test_chunks_follow_context_state() {
        let mut pctx = PipelineContext::new("hi");
        assert!(StreamChunk::after_stage(StageKind::Intent, &pctx).is_none());
        assert!(StreamChunk::after_stage(StageKind::Quality, &pctx).is_none());

        pctx.intent = Some(IntentResult::new(IntentType::Conversation, 0.8));
        let chunk = StreamChunk::after_stage(StageKind::Intent, &pctx).unwrap();
        assert!(matches!(chunk, StreamChunk::Intent { .. }));
        assert!(!chunk.is_terminal());
    }

    #[test]
    fn test_chunk_serializes_with_type_tag() {
        let chunk = StreamChunk::Error {
            request_id: "r1".to_owned(),
            message: "boom".to_owned(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["type"], "error");
        assert!(chunk.is_terminal());
    }
}
