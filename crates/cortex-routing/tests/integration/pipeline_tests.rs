//! End-to-end pipeline runs over mock backends.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use anyhow::Context as _;
use cortex_core::mock::{MockChatClient, MockRetrievalClient, MockWebSearcher};
use cortex_routing::{
    IntentType, PipelineContext, RequestOptions, RoutingError, TargetBackend,
};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use crate::common::{Fixture, heuristic_config};

#[tokio::test]
async fn test_greeting_is_answered_by_chat() {
    let fixture = Fixture::default();
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process("Hello there!", Some("conv-7"), RequestOptions::default(), &CancellationToken::new())
            .await
    );

    assert_eq!(pctx.intent.as_ref().map(|intent| intent.primary), Some(IntentType::Conversation));
    assert_eq!(pctx.response.as_deref(), Some("Mock response for: Hello there!"));
    let route = pctx.route.as_ref().unwrap();
    assert_eq!(route.target, TargetBackend::Chat);
    assert_eq!(route.served_by, heuristic_config().models.default_model);
    assert!(!route.used_fallback);
    assert_eq!(pctx.conversation_id.as_deref(), Some("conv-7"));
    assert_eq!(pctx.metrics.stage_durations_ms.len(), engine.stage_names().len());
    assert!(pctx.metrics.tokens.total() > 0);
    // English prompts never reach the translator
    assert_eq!(fixture.chat().call_count(), 1);
    assert_eq!(engine.active_requests(), 0);
}

#[tokio::test]
async fn test_factual_question_is_grounded_in_retrieval() -> anyhow::Result<()> {
    let fixture = Fixture::default().with_retrieval(
        MockRetrievalClient::new()
            .with_document("Paris is the capital of France", 0.9)
            .with_document("Lyon is known for its cuisine", 0.1),
    );
    let engine = fixture.engine(&heuristic_config());

    let pctx = engine
        .process("What is the capital of France?", None, RequestOptions::default(), &CancellationToken::new())
        .await?;

    let strategy = pctx.strategy.as_ref().context("strategy selected")?;
    assert_eq!(strategy.id, "factual");
    assert_eq!(pctx.metrics.enrichment_count, 1);
    assert!(pctx.enrichments[0].success);
    assert!(!pctx.enrichments[0].content.contains("Lyon"));
    assert_eq!(pctx.metrics.quality_sufficient, Some(true));

    let request = fixture.chat().get_call_history().pop().context("chat was called")?;
    assert!(request.messages[0].content.contains("Paris is the capital of France"));
    assert_eq!(request.last_user_message(), Some("What is the capital of France?"));
    Ok(())
}

#[tokio::test]
async fn test_translation_feeds_analysis_but_not_the_answer() {
    let prompt = "Was sind die aktuellen Nachrichten?";
    let fixture = Fixture::default()
        .with_chat(
            MockChatClient::new()
                .with_response("Translate the user's text", "\"What is the current news?\""),
        )
        .with_web(MockWebSearcher::new().with_result(
            "Morning briefing",
            "https://news.example.com/today",
            "Markets opened higher",
        ));
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(prompt, None, RequestOptions::default(), &CancellationToken::new())
            .await
    );

    assert_eq!(pctx.prompt(), prompt);
    assert_eq!(pctx.analysis_prompt(), "What is the current news?");
    assert_eq!(pctx.source_language.as_deref(), Some("de"));
    let intent = pctx.intent.as_ref().unwrap();
    assert_eq!(intent.primary, IntentType::WebResearch);
    assert_eq!(intent.language, "de");
    assert_eq!(fixture.web.queries(), vec!["What is the current news?".to_owned()]);

    let answer = fixture.chat().get_call_history().pop().unwrap();
    assert_eq!(answer.last_user_message(), Some(prompt));
    assert!(answer.messages[0].content.contains("Markets opened higher"));
}

#[tokio::test]
async fn test_untranslated_prompt_keeps_detected_language() {
    let prompt = "Was sind die aktuellen Nachrichten?";
    let fixture = Fixture::default().without_chat();
    let engine = fixture.engine(&heuristic_config());
    let mut pctx = PipelineContext::new(prompt);

    // Web research answers through chat, which is not configured.
    let error = assert_err!(engine.execute(&CancellationToken::new(), &mut pctx).await);

    assert!(matches!(&error, RoutingError::StageFailed { stage, .. } if stage == "routing"));
    assert_eq!(pctx.source_language.as_deref(), Some("de"));
    assert_eq!(pctx.analysis_prompt(), prompt);
    assert_eq!(pctx.intent.as_ref().map(|intent| intent.language.as_str()), Some("de"));
    assert!(pctx.response.is_none());
}

#[tokio::test]
async fn test_summary_request_uses_nlp_backend() {
    let fixture = Fixture::default();
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(
                "Summarize the key points from the quarterly planning meeting",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(fixture.nlp.calls(), vec!["summarize".to_owned()]);
    let route = pctx.route.as_ref().unwrap();
    assert_eq!(route.target, TargetBackend::Nlp);
    assert_eq!(route.served_by, "nlp:summarize");
    assert!(pctx.response.unwrap().starts_with("Summary: "));
    assert_eq!(fixture.chat().call_count(), 0);
}

#[tokio::test]
async fn test_forced_strategy_and_model_override_intent() {
    let fixture = Fixture::default();
    let engine = fixture.engine(&heuristic_config());
    let options = RequestOptions {
        force_strategy: Some("creative".to_owned()),
        force_model: Some("gpt-oss:20b".to_owned()),
        ..RequestOptions::default()
    };

    let pctx = assert_ok!(
        engine
            .process("Hello there!", None, options, &CancellationToken::new())
            .await
    );

    let strategy = pctx.strategy.as_ref().unwrap();
    assert_eq!(strategy.id, "creative");
    assert_eq!(strategy.model, "gpt-oss:20b");
    assert_eq!(fixture.chat().models_called(), vec!["gpt-oss:20b".to_owned()]);
}

#[tokio::test]
async fn test_skipped_enrichment_is_advisory_only() {
    let fixture = Fixture::default()
        .with_retrieval(MockRetrievalClient::new().with_document("Paris", 0.9));
    let engine = fixture.engine(&heuristic_config());
    let options = RequestOptions {
        skip_enrichment: true,
        ..RequestOptions::default()
    };

    let pctx = assert_ok!(
        engine
            .process("What is the capital of France?", None, options, &CancellationToken::new())
            .await
    );

    assert!(fixture.retrieval.search_calls().is_empty());
    assert!(pctx.enrichments.is_empty());
    assert_eq!(pctx.metrics.quality_sufficient, Some(false));
    assert!(pctx.response.is_some());
}

#[tokio::test]
async fn test_primary_model_failure_uses_fallback() {
    let config = heuristic_config();
    let fixture = Fixture::default()
        .with_chat(MockChatClient::new().with_failing_model(config.models.default_model.clone()));
    let engine = fixture.engine(&config);

    let pctx = assert_ok!(
        engine
            .process("Hello there!", None, RequestOptions::default(), &CancellationToken::new())
            .await
    );

    let route = pctx.route.as_ref().unwrap();
    assert!(route.used_fallback);
    assert_eq!(route.served_by, config.models.fallback_model);
    assert_eq!(
        fixture.chat().models_called(),
        vec![config.models.default_model.clone(), config.models.fallback_model.clone()]
    );
}
