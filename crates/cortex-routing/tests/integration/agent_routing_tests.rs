//! Agent selection, single-task plans and multi-agent orchestration.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use anyhow::Context as _;
use cortex_core::mock::MockAgentBackend;
use cortex_routing::router::metadata;
use cortex_routing::{IntentType, PipelineContext, RequestOptions, TargetBackend};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use crate::common::{Fixture, heuristic_config};

fn meta<'ctx>(pctx: &'ctx PipelineContext, key: &str) -> Option<&'ctx str> {
    pctx.metadata.get(key).map(String::as_str)
}

#[tokio::test]
async fn test_forced_agent_bypasses_matching_and_orchestration() {
    let fixture = Fixture::default();
    let engine = fixture.engine(&heuristic_config());
    let options = RequestOptions {
        force_agent: Some("planner".to_owned()),
        ..RequestOptions::default()
    };

    let pctx = assert_ok!(
        engine
            .process(
                "Break down the release into a project plan",
                None,
                options,
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(
        pctx.intent.as_ref().map(|intent| intent.primary),
        Some(IntentType::TaskDecomposition)
    );
    assert!(fixture.agents.match_history().is_empty());
    let calls = fixture.agents.execute_history();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].agent_id, "planner");
    assert_eq!(meta(&pctx, metadata::AGENT_CONFIDENCE), Some("1.00"));
    assert_eq!(meta(&pctx, metadata::AGENT_SELECTION), Some("forced"));
    assert!(pctx.orchestration.is_none());
    assert!(!pctx.route.as_ref().unwrap().orchestrated);
}

#[tokio::test]
async fn test_strategy_agent_is_preferred_over_matching() {
    let fixture = Fixture::default()
        .with_agents(MockAgentBackend::new().with_agent("python", "py-expert", 0.95));
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(
                "Write a Python function that parses ISO dates",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(pctx.route.as_ref().unwrap().target, TargetBackend::Agent);
    assert_eq!(meta(&pctx, metadata::AGENT_ID), Some("code-assistant"));
    assert_eq!(meta(&pctx, metadata::AGENT_SELECTION), Some("strategy"));
    assert!(fixture.agents.match_history().is_empty());
    assert_eq!(pctx.response.as_deref(), Some("code-assistant handled request"));
}

#[tokio::test]
async fn test_confident_match_is_used_when_orchestration_is_off() {
    let mut config = heuristic_config();
    config.orchestrator.enabled = false;
    let fixture = Fixture::default()
        .with_agents(MockAgentBackend::new().with_agent("migration", "db-expert", 0.8));
    let engine = fixture.engine(&config);

    let pctx = assert_ok!(
        engine
            .process(
                "Break down the database migration into small steps",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(meta(&pctx, metadata::AGENT_ID), Some("db-expert"));
    assert_eq!(meta(&pctx, metadata::AGENT_NAME), Some("db-expert agent"));
    assert_eq!(meta(&pctx, metadata::AGENT_CONFIDENCE), Some("0.80"));
    assert_eq!(meta(&pctx, metadata::AGENT_SELECTION), Some("matched"));
    assert!(pctx.orchestration.is_none());
}

#[tokio::test]
async fn test_weak_match_falls_back_to_default_agent() {
    let mut config = heuristic_config();
    config.orchestrator.enabled = false;
    let fixture = Fixture::default()
        .with_agents(MockAgentBackend::new().with_fallback_match("intern", 0.2));
    let engine = fixture.engine(&config);

    let pctx = assert_ok!(
        engine
            .process(
                "Break down the onboarding into a workflow",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(meta(&pctx, metadata::AGENT_ID), Some("general"));
    assert_eq!(meta(&pctx, metadata::AGENT_CONFIDENCE), Some("0.20"));
    assert_eq!(meta(&pctx, metadata::AGENT_SELECTION), Some("default"));
    assert_eq!(fixture.agents.execute_history()[0].agent_id, "general");
}

#[tokio::test]
async fn test_single_action_prompt_runs_as_one_task_plan() {
    let prompt = "Break down the release into a project plan";
    let fixture = Fixture::default();
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(prompt, None, RequestOptions::default(), &CancellationToken::new())
            .await
    );

    let orchestration = pctx.orchestration.as_ref().unwrap();
    assert_eq!(orchestration.plan.tasks.len(), 1);
    assert!(orchestration.success);
    assert_eq!(pctx.route.as_ref().unwrap().served_by, "orchestrator");

    let calls = fixture.agents.execute_history();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, prompt);
    assert_eq!(pctx.response.as_deref(), Some("general handled request"));
}

#[tokio::test]
async fn test_multi_step_prompt_chains_agents() -> anyhow::Result<()> {
    let fixture = Fixture::default().with_agents(
        MockAgentBackend::new()
            .with_agent("compare:", "analyst", 0.8)
            .with_agent("research:", "researcher", 0.9)
            .with_response("Your task: Research", "Paris was founded by the Parisii"),
    );
    let engine = fixture.engine(&heuristic_config());

    let pctx = engine
        .process(
            "Research the history of Paris and then compare it with Rome",
            Some("conv-42"),
            RequestOptions::default(),
            &CancellationToken::new(),
        )
        .await?;

    let intent = pctx.intent.as_ref().context("intent classified")?;
    assert_eq!(intent.primary, IntentType::MultiStep);
    let route = pctx.route.as_ref().context("route recorded")?;
    assert!(route.orchestrated);
    assert_eq!(route.served_by, "orchestrator");

    let orchestration = pctx.orchestration.as_ref().context("orchestration recorded")?;
    let assigned: Vec<&str> = orchestration
        .plan
        .tasks
        .iter()
        .map(|planned| planned.assigned_agent_id.as_str())
        .collect();
    assert_eq!(assigned, vec!["researcher", "analyst"]);
    assert!(orchestration.success);

    let calls = fixture.agents.execute_history();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].message.contains("Results from previous tasks"));
    assert!(calls[1].message.contains("Results from previous tasks:\nParis was founded by the Parisii"));
    assert!(
        calls
            .iter()
            .all(|call| call.conversation_id.as_deref() == Some("conv-42"))
    );
    assert_eq!(pctx.response.as_deref(), Some("analyst handled request"));
    Ok(())
}

#[tokio::test]
async fn test_failed_task_keeps_plan_running() {
    let fixture = Fixture::default().with_agents(
        MockAgentBackend::new()
            .with_agent("compare:", "analyst", 0.8)
            .with_agent("research:", "researcher", 0.9)
            .with_failing_agent("researcher"),
    );
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(
                "Research the history of Paris and then compare it with Rome",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    let orchestration = pctx.orchestration.as_ref().unwrap();
    assert!(!orchestration.success);
    assert_eq!(orchestration.failed_tasks(), 1);
    assert_eq!(fixture.agents.execute_history().len(), 2);
    assert_eq!(pctx.response.as_deref(), Some("analyst handled request"));
}

#[tokio::test]
async fn test_failed_single_task_plan_falls_back_to_one_agent() {
    let fixture =
        Fixture::default().with_agents(MockAgentBackend::new().with_transient_failures(1));
    let engine = fixture.engine(&heuristic_config());

    let pctx = assert_ok!(
        engine
            .process(
                "Break down the release into a project plan",
                None,
                RequestOptions::default(),
                &CancellationToken::new(),
            )
            .await
    );

    assert!(pctx.orchestration.is_none());
    let route = pctx.route.as_ref().unwrap();
    assert!(!route.orchestrated);
    assert_eq!(route.served_by, "general");
    assert_eq!(meta(&pctx, metadata::AGENT_SELECTION), Some("matched"));
    assert_eq!(meta(&pctx, metadata::AGENT_ID), Some("general"));
    // One failed orchestrated attempt, then the single-agent call.
    assert_eq!(fixture.agents.execute_history().len(), 2);
    assert_eq!(pctx.response.as_deref(), Some("general handled request"));
}
