// SPDX-License-Identifier: MIT

//! `StepFlowHandler` — wraps a `StepMachine` (C7) as a `CompletionHandler`
//! (C4), so a declarative, registry-driven agent can sit inside a
//! `CompositeHandler` next to the simpler strategies (spec §4.9, §4.10:
//! "the active handler — possibly a CompositeHandler containing a
//! StepMachine-backed one").

use crate::handler::{BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver, StepsRegistry};
use af_steps::{prompt_stem, StepMachine, StepResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A `StepFlowHandler` needs one thing no other strategy does: the `c1`
/// C3L coordinate (the agent/run family), supplied by the caller rather
/// than stored on any `StepDefinition` (spec §6.1).
pub struct StepFlowHandler {
    c1: String,
    machine: StepMachine,
    /// Values for `customVariables` resolved by the host (stdin/github/
    /// parameter/context sources) before each turn; opaque to this crate
    /// beyond being merged with the step's own hand-off projections.
    extra_vars: HashMap<String, String>,
    /// Set when the last `advance` call failed with `IntentMissing`;
    /// cleared on the next successful one. Surfaced via `routing_failure`.
    last_routing_failure: Option<(String, u32)>,
}

impl StepFlowHandler {
    pub fn new(
        c1: impl Into<String>,
        registry: Arc<StepsRegistry>,
        mode: Option<&str>,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, af_core::ConfigurationError> {
        let machine = StepMachine::new(registry, mode).map_err(|err| match err {
            af_steps::StepFlowError::Configuration(c) => c,
            af_steps::StepFlowError::IntentMissing { .. } => {
                unreachable!("StepMachine::new never returns IntentMissing")
            }
        })?;
        Ok(Self {
            c1: c1.into(),
            machine,
            extra_vars,
            last_routing_failure: None,
        })
    }

    pub fn step_machine(&self) -> &StepMachine {
        &self.machine
    }
}

#[async_trait]
impl CompletionHandler for StepFlowHandler {
    fn handler_type(&self) -> &'static str {
        "stepFlow"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        let step = self.machine.current_step();
        let stem = prompt_stem(&self.c1, step);
        match resolver.resolve(&stem, &self.extra_vars).await {
            Ok(prompt) => prompt,
            Err(_) => format!(
                "Begin step `{}`. No prompt template was available for `{}`.",
                step.step_id, stem
            ),
        }
    }

    async fn build_continuation_prompt(
        &mut self,
        iteration: u32,
        prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        self.machine
            .build_continuation_prompt(iteration, prev, resolver, &self.extra_vars)
            .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        let step = self.machine.current_step();
        CompletionCriteria {
            short: format!("step flow (currently `{}`)", step.step_id),
            detailed: format!(
                "Complete when the step flow reaches a `closure` transition; currently on `{}`",
                step.step_id
            ),
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.machine.is_complete()
    }

    fn completion_description(&self) -> String {
        let state = self.machine.state();
        if state.is_complete() {
            format!(
                "step flow closed: {}",
                state.completion_reason.as_deref().unwrap_or("closure")
            )
        } else {
            format!(
                "on step `{}` (retry {})",
                self.machine.current_step().step_id,
                state.retry_count
            )
        }
    }

    /// Advances the machine using this iteration's summary immediately, so
    /// that the `isComplete()` call `AgentLoop` makes right after this
    /// (spec §4.10 step 6) observes the transition this summary produced
    /// rather than lagging a full iteration behind.
    fn set_current_summary(&mut self, summary: IterationSummary) {
        match self.machine.advance(&summary) {
            Ok(_) => self.last_routing_failure = None,
            Err(af_steps::StepFlowError::IntentMissing { step_id, iteration: at }) => {
                tracing::error!(step_id, iteration = at, "step routing failed: intent missing");
                self.last_routing_failure = Some((step_id, at));
            }
            Err(err) => {
                tracing::error!(%err, "step routing failed");
            }
        }
    }

    fn current_output_schema_ref(&self) -> Option<&str> {
        self.machine.current_step().output_schema_ref.as_deref()
    }

    fn current_step_id(&self) -> Option<&str> {
        Some(&self.machine.current_step().step_id)
    }

    fn routing_failure(&self) -> Option<(String, u32)> {
        self.last_routing_failure.clone()
    }

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}

/// Report a step's completed-or-not outcome to the machine directly,
/// bypassing structured-gate extraction — used when a caller already knows
/// the pass/fail verdict (e.g. a validator-based retry, spec §7).
pub fn report_step_result(handler: &mut StepFlowHandler, step_id: &str, passed: bool) {
    let _ = handler.machine.transition(StepResult { step_id, passed });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::NoopResolver;
    use af_core::{CustomVariable, StepDefinition, StructuredGateConfig, TransitionTarget};
    use serde_json::json;
    use std::collections::HashMap as Map;

    fn registry() -> Arc<StepsRegistry> {
        let mut steps = Map::new();
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
                    handoff_fields: vec!["summary".to_string()],
                },
                transitions: Map::from([
                    (
                        "next".to_string(),
                        TransitionTarget {
                            target: "closure".to_string(),
                        },
                    ),
                    (
                        "repeat".to_string(),
                        TransitionTarget {
                            target: "initial.test".to_string(),
                        },
                    ),
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
            entry_step_mapping: Map::new(),
            steps,
            completion_patterns: Vec::new(),
            validators: Vec::new(),
        })
    }

    #[tokio::test]
    async fn delegates_completion_to_the_wrapped_machine() {
        let mut handler =
            StepFlowHandler::new("issue-agent", registry(), None, Map::new()).unwrap();
        assert!(!handler.is_complete().await);

        let mut summary = IterationSummary::new(1);
        summary.structured_output = Some(json!({"next_action": {"action": "next"}, "summary": "done"}));
        handler.set_current_summary(summary);
        assert!(handler.is_complete().await);
    }

    #[tokio::test]
    async fn falls_back_to_an_inline_prompt_without_a_resolver_template() {
        let handler = StepFlowHandler::new("issue-agent", registry(), None, Map::new()).unwrap();
        let prompt = handler.build_initial_prompt(&NoopResolver).await;
        assert!(prompt.contains("initial.test"));
    }
}
