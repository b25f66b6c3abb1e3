//! Streaming execution, cancellation and custom stages.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    clippy::panic,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use async_trait::async_trait;
use cortex_routing::{
    PipelineConfig, PipelineContext, PipelineEngine, PipelineStage, Result, StreamChunk,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::common::{Fixture, collect_chunks, heuristic_config, init_tracing};

fn label(chunk: &StreamChunk) -> &'static str {
    match chunk {
        StreamChunk::Intent { .. } => "intent",
        StreamChunk::Strategy { .. } => "strategy",
        StreamChunk::Enrichment { .. } => "enrichment",
        StreamChunk::Response { .. } => "response",
        StreamChunk::Complete { .. } => "complete",
        StreamChunk::Error { .. } => "error",
    }
}

#[tokio::test]
async fn test_stream_follows_stage_order() {
    let fixture = Fixture::default();
    let engine = Arc::new(fixture.engine(&heuristic_config()));
    let pctx = PipelineContext::new("Hello there!").with_request_id("stream-1");

    let chunks = collect_chunks(engine.spawn_stream(CancellationToken::new(), pctx)).await;

    let labels: Vec<&str> = chunks.iter().map(label).collect();
    assert_eq!(labels, vec!["intent", "strategy", "enrichment", "response", "complete"]);
    assert_eq!(chunks.iter().filter(|chunk| chunk.is_terminal()).count(), 1);

    let json = serde_json::to_value(chunks.last().unwrap()).unwrap();
    assert_eq!(json["type"], "complete");
    assert_eq!(json["request_id"], "stream-1");
}

#[tokio::test]
async fn test_stream_ends_with_error_chunk_on_failure() {
    let fixture = Fixture::default().without_chat();
    let engine = Arc::new(fixture.engine(&heuristic_config()));

    let chunks = collect_chunks(
        engine.spawn_stream(CancellationToken::new(), PipelineContext::new("Hello there!")),
    )
    .await;

    let labels: Vec<&str> = chunks.iter().map(label).collect();
    assert_eq!(labels, vec!["intent", "strategy", "enrichment", "error"]);
    let Some(StreamChunk::Error { message, .. }) = chunks.last() else {
        panic!("expected a terminal error chunk");
    };
    assert!(message.contains("stage routing failed"));
}

#[tokio::test]
async fn test_cancelled_token_yields_only_error_chunk() {
    let fixture = Fixture::default();
    let engine = Arc::new(fixture.engine(&heuristic_config()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let chunks = collect_chunks(engine.spawn_stream(cancel, PipelineContext::new("Hello there!"))).await;

    assert_eq!(chunks.len(), 1);
    assert!(matches!(&chunks[0], StreamChunk::Error { message, .. } if message.contains("cancelled")));
    assert_eq!(fixture.chat().call_count(), 0);
    assert_eq!(engine.active_requests(), 0);
}

/// Parks until released, so a request can be cancelled mid-flight.
struct GateStage {
    release: Arc<Notify>,
}

#[async_trait]
impl PipelineStage for GateStage {
    fn name(&self) -> &'static str {
        "gate"
    }

    async fn process(&self, _cancel: &CancellationToken, _pctx: &mut PipelineContext) -> Result<()> {
        self.release.notified().await;
        Ok(())
    }
}

struct CountingStage {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PipelineStage for CountingStage {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn process(&self, _cancel: &CancellationToken, _pctx: &mut PipelineContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_cancel_by_request_id_stops_before_next_stage() {
    init_tracing();
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let stages: Vec<Arc<dyn PipelineStage>> = vec![
        Arc::new(GateStage {
            release: Arc::clone(&release),
        }),
        Arc::new(CountingStage {
            calls: Arc::clone(&calls),
        }),
    ];
    let engine = Arc::new(PipelineEngine::new(stages, PipelineConfig::default()));

    let receiver = engine.spawn_stream(
        CancellationToken::new(),
        PipelineContext::new("long running").with_request_id("req-1"),
    );
    while engine.status("req-1").is_none() {
        sleep(Duration::from_millis(5)).await;
    }

    assert!(engine.cancel("req-1"));
    assert!(engine.status("req-1").unwrap().cancelled);
    assert!(!engine.cancel("unknown"));
    release.notify_one();

    let chunks = collect_chunks(receiver).await;
    assert_eq!(chunks.len(), 1);
    assert!(matches!(&chunks[0], StreamChunk::Error { message, .. } if message.contains("before stage counting")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(engine.status("req-1").is_none());
}
