//! Final dispatch stage.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::router::Router;
use crate::types::PipelineContext;

/// Dispatches the request through the [`Router`].
pub struct RoutingStage {
    router: Arc<Router>,
}

impl RoutingStage {
    /// Wraps a shared router.
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl PipelineStage for RoutingStage {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn kind(&self) -> StageKind {
        StageKind::Routing
    }

    async fn process(&self, cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        self.router.route(cancel, pctx).await
    }
}
