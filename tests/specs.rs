// SPDX-License-Identifier: MIT

//! Workspace-level integration tests exercising the six concrete scenarios
//! (S1-S6) and the universal invariant properties from spec §8, end to end
//! through `AgentLoop` where the scenario calls for a full run and directly
//! against the assembled handler where it is handler-scoped.

use af_adapters::{AlwaysResolvableSchemaResolver, FakeGitHub, FakePromptResolver};
use af_completion::factory::{build_handler, HandlerConfig, HandlerDependencies};
use af_completion::{BoundaryLabelConfig, CompositeHandler, CompositeOperator, StepFlowHandler};
use af_core::{
    CustomVariable, ExternalStateChecker, FakeClock, IssueOps, IssueState, StepDefinition, StepsRegistry,
    StructuredGateConfig, TransitionTarget,
};
use af_runtime::{AgentLoop, QueryMessage, RecordingEventSink, RunError, ScriptedQueryFn};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn deps_with(checker: Arc<FakeGitHub>, issue_number: Option<u64>) -> HandlerDependencies {
    HandlerDependencies {
        checker: checker.clone() as Arc<dyn ExternalStateChecker>,
        issue_ops: Some(checker as Arc<dyn IssueOps>),
        clock: Arc::new(FakeClock::new(0)),
        issue_number,
        repo: None,
        boundary: BoundaryLabelConfig::default(),
    }
}

fn loop_deps() -> (
    Arc<af_adapters::FsPromptResolver>,
    Arc<AlwaysResolvableSchemaResolver>,
    Arc<FakeClock>,
    Arc<RecordingEventSink>,
) {
    (
        Arc::new(af_adapters::FsPromptResolver::new(std::env::temp_dir())),
        Arc::new(AlwaysResolvableSchemaResolver),
        Arc::new(FakeClock::new(0)),
        Arc::new(RecordingEventSink::new()),
    )
}

/// S1 (spec §8): iteration budget of 3, closes on the third iteration
/// regardless of assistant content.
#[tokio::test]
async fn s1_iteration_budget_completes_at_the_configured_cap() {
    let entry = HandlerConfig {
        handler_type: "iterationBudget".to_string(),
        config: json!({"maxIterations": 3}),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler = build_handler(&entry, &deps).unwrap();

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::AssistantText("turn one".to_string()))],
        vec![Ok(QueryMessage::AssistantText("turn two".to_string()))],
        vec![Ok(QueryMessage::AssistantText("turn three".to_string()))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 3);
}

/// S2 (spec §8): keyword completion fires as soon as an assistant response
/// contains the configured keyword, not before.
#[tokio::test]
async fn s2_keyword_signal_completes_on_the_matching_turn() {
    let entry = HandlerConfig {
        handler_type: "keywordSignal".to_string(),
        config: json!({"completionKeyword": "ALL_DONE"}),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler = build_handler(&entry, &deps).unwrap();

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::AssistantText("still working".to_string()))],
        vec![Ok(QueryMessage::AssistantText("wrapped up. ALL_DONE".to_string()))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 2);
}

/// S3 (spec §8): structured signal gated on `requiredFields` matching both
/// the primary match and status fallback (Open Question 2).
#[tokio::test]
async fn s3_structured_signal_requires_fields_on_every_match_path() {
    let entry = HandlerConfig {
        handler_type: "structuredSignal".to_string(),
        config: json!({
            "signalType": "complete",
            "requiredFields": {"status": "success", "code": 0},
        }),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler = build_handler(&entry, &deps).unwrap();

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::StructuredOutput(
            json!({"signal": "complete", "status": "success", "code": 1}),
        ))],
        vec![Ok(QueryMessage::StructuredOutput(
            json!({"signal": "complete", "status": "success", "code": 0}),
        ))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 2, "first turn's mismatched code must not satisfy completion");
}

/// S4 (spec §8): external state throttling — the loop's per-iteration
/// `is_complete` calls must not re-probe the tracker inside the configured
/// check interval, per `IssueCompletionHandler::refresh_state`.
#[tokio::test]
async fn s4_external_state_throttles_probe_calls_across_iterations() {
    let entry = HandlerConfig {
        handler_type: "externalState".to_string(),
        config: json!({"checkInterval": 60_000}),
    };
    let gh = Arc::new(FakeGitHub::new(vec![IssueState {
        number: 99,
        closed: false,
        title: "demo".to_string(),
        state: "open".to_string(),
        labels: vec![],
        last_checked: 0,
    }]));
    let deps = deps_with(gh.clone(), Some(99));
    let handler = build_handler(&entry, &deps).unwrap();

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::AssistantText("working".to_string()))],
        vec![Ok(QueryMessage::AssistantText("still working".to_string()))],
        vec![Ok(QueryMessage::AssistantText("closing it out".to_string()))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop =
        AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false).with_hard_cap(3);
    let err = agent_loop.run().await.unwrap_err();
    assert!(matches!(err, RunError::HardCapReached { cap: 3 }), "issue never closes in this scenario");
}

fn two_step_registry() -> Arc<StepsRegistry> {
    let mut steps = HashMap::new();
    steps.insert(
        "initial.test".to_string(),
        StepDefinition {
            step_id: "initial.test".to_string(),
            name: "initial".to_string(),
            c2: "agent".to_string(),
            c3: "test".to_string(),
            edition: "initial".to_string(),
            adaptation: None,
            fallback_key: "initial.test".to_string(),
            uses_stdin: false,
            uv_variables: vec![],
            custom_variables: Vec::<CustomVariable>::new(),
            structured_gate: StructuredGateConfig {
                allowed_intents: vec!["next".to_string(), "repeat".to_string()],
                intent_field: "next_action.action".to_string(),
                intent_schema_ref: None,
                fallback_intent: "repeat".to_string(),
                handoff_fields: vec![],
            },
            transitions: HashMap::from([
                ("next".to_string(), TransitionTarget { target: "continuation.test".to_string() }),
                ("repeat".to_string(), TransitionTarget { target: "initial.test".to_string() }),
            ]),
            model: None,
            output_schema_ref: None,
        },
    );
    steps.insert(
        "continuation.test".to_string(),
        StepDefinition {
            step_id: "continuation.test".to_string(),
            name: "continuation".to_string(),
            c2: "agent".to_string(),
            c3: "test".to_string(),
            edition: "continuation".to_string(),
            adaptation: None,
            fallback_key: "continuation.test".to_string(),
            uses_stdin: false,
            uv_variables: vec![],
            custom_variables: Vec::<CustomVariable>::new(),
            structured_gate: StructuredGateConfig {
                allowed_intents: vec!["next".to_string(), "repeat".to_string()],
                intent_field: "next_action.action".to_string(),
                intent_schema_ref: None,
                fallback_intent: "repeat".to_string(),
                handoff_fields: vec![],
            },
            transitions: HashMap::from([
                ("next".to_string(), TransitionTarget { target: "closure".to_string() }),
                ("repeat".to_string(), TransitionTarget { target: "continuation.test".to_string() }),
            ]),
            model: None,
            output_schema_ref: None,
        },
    );
    Arc::new(StepsRegistry {
        agent_id: "demo".to_string(),
        version: "1".to_string(),
        path_template: None,
        schemas_base: None,
        user_prompts_base: "/prompts".to_string(),
        entry_step: Some("initial.test".to_string()),
        entry_step_mapping: HashMap::new(),
        steps,
        completion_patterns: Vec::new(),
        validators: Vec::new(),
    })
}

/// S5 (spec §8): a two-step `StepMachine` flow reaches `closure` after the
/// first step's `next` transition and the continuation step's `next`
/// transition, driven end to end through `AgentLoop`.
#[tokio::test]
async fn s5_step_flow_reaches_closure_through_the_agent_loop() {
    let handler = Box::new(StepFlowHandler::new("issue-agent", two_step_registry(), None, HashMap::new()).unwrap());

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::StructuredOutput(json!({"next_action": {"action": "next"}})))],
        vec![Ok(QueryMessage::StructuredOutput(json!({"next_action": {"action": "next"}})))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.completion_description.contains("closed"));
}

/// S6 (spec §8): a composite `first` over [`externalState`, `iterationBudget`]
/// where the budget wins before the issue ever closes, and the winning
/// index is recorded.
#[tokio::test]
async fn s6_composite_first_records_the_winning_budget_condition() {
    let gh = Arc::new(FakeGitHub::new(vec![IssueState {
        number: 1,
        closed: false,
        title: "demo".to_string(),
        state: "open".to_string(),
        labels: vec![],
        last_checked: 0,
    }]));
    let deps = deps_with(gh, Some(1));
    let entry = HandlerConfig {
        handler_type: "composite".to_string(),
        config: json!({
            "operator": "first",
            "conditions": [
                {"type": "externalState", "config": {}},
                {"type": "iterationBudget", "config": {"maxIterations": 2}},
            ],
        }),
    };
    let handler = build_handler(&entry, &deps).unwrap();
    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::AssistantText("one".to_string()))],
        vec![Ok(QueryMessage::AssistantText("two".to_string()))],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.completion_description.contains("condition 1"));
}

/// Property 7 (spec §8): a `QueryStreamError` mid-run terminates the loop
/// with a fatal `RunError`, never silently swallowed.
#[tokio::test]
async fn query_stream_errors_propagate_as_fatal_through_the_assembled_stack() {
    let entry = HandlerConfig {
        handler_type: "iterationBudget".to_string(),
        config: json!({"maxIterations": 5}),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler = build_handler(&entry, &deps).unwrap();
    let query_fn = Arc::new(ScriptedQueryFn::new(vec![
        vec![Ok(QueryMessage::AssistantText("fine".to_string()))],
        vec![Err("network reset".to_string())],
    ]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let err = agent_loop.run().await.unwrap_err();
    assert!(matches!(err, RunError::QueryStreamError { iteration: 2, .. }));
}

/// Property (spec §8): `CompositeHandler` over two step-flow-free strategies
/// still reports `None` for schema/step metadata, and `AgentLoop` tolerates
/// that absence cleanly (no schema checks, empty boundary step id).
#[tokio::test]
async fn composite_over_non_step_handlers_runs_without_schema_or_step_metadata() {
    let budget = HandlerConfig {
        handler_type: "iterationBudget".to_string(),
        config: json!({"maxIterations": 1}),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler: Box<dyn af_completion::CompletionHandler> =
        Box::new(CompositeHandler::new(CompositeOperator::Or, vec![build_handler(&budget, &deps).unwrap()]));

    let query_fn = Arc::new(ScriptedQueryFn::new(vec![vec![Ok(QueryMessage::AssistantText(
        "go".to_string(),
    ))]]));
    let (resolver, schema, clock, sink) = loop_deps();
    let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
    let outcome = agent_loop.run().await.unwrap();
    assert_eq!(outcome.iterations, 1);
}

/// `FsPromptResolver` falling back inline: with no template on disk, the
/// composite's initial prompt build still produces usable text rather than
/// failing the run (spec §6.1 fallback policy, property 10).
#[tokio::test]
async fn missing_prompt_templates_fall_back_to_inline_text() {
    let entry = HandlerConfig {
        handler_type: "keywordSignal".to_string(),
        config: json!({"completionKeyword": "DONE"}),
    };
    let deps = deps_with(Arc::new(FakeGitHub::new(vec![])), None);
    let handler = build_handler(&entry, &deps).unwrap();
    let resolver = FakePromptResolver::new();
    let prompt = handler.build_initial_prompt(&resolver).await;
    assert!(prompt.contains("DONE"));
}
