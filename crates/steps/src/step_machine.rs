// SPDX-License-Identifier: MIT

//! `StepMachine` (C7) — registry-driven step state machine.

use crate::c3l::continuation_fallback_key;
use crate::error::StepFlowError;
use crate::structured_gate;
use af_core::{IterationSummary, PromptResolver, StepDefinition, StepState, StepsRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// The outcome of one step's work, as reported by the caller driving the loop.
#[derive(Debug, Clone, Copy)]
pub struct StepResult<'a> {
    pub step_id: &'a str,
    pub passed: bool,
}

/// Where a `transition` landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Step(String),
    Closure,
}

/// Owns its registry via `Arc` (rather than borrowing it) so it can be
/// embedded in a `'static` `dyn CompletionHandler` (see `af-completion`'s
/// `StepFlowHandler`), not just used standalone.
pub struct StepMachine {
    registry: Arc<StepsRegistry>,
    state: StepState,
    last_summary: Option<IterationSummary>,
}

impl StepMachine {
    /// Build a machine for `registry`, starting at its resolved entry step.
    pub fn new(registry: Arc<StepsRegistry>, mode: Option<&str>) -> Result<Self, StepFlowError> {
        let entry = registry
            .entry_step_for_mode(mode)
            .ok_or(af_core::ConfigurationError::MissingEntryStep)?;
        let entry = entry.to_string();
        Ok(Self {
            registry,
            state: StepState::new(entry),
            last_summary: None,
        })
    }

    pub fn registry(&self) -> &StepsRegistry {
        &self.registry
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    #[allow(clippy::expect_used)]
    pub fn current_step(&self) -> &StepDefinition {
        self.registry
            .steps
            .get(&self.state.current_step_id)
            .expect("current_step_id always names a step present in the registry")
    }

    /// Pure computation of the transition target for `result`, without
    /// mutating state (spec §4.9 `getNextStep`).
    pub fn next_step(&self, result: StepResult<'_>) -> Result<NextStep, StepFlowError> {
        let step = self
            .registry
            .steps
            .get(result.step_id)
            .ok_or_else(|| af_core::ConfigurationError::UnknownEntryStep(result.step_id.to_string()))?;
        let intent = if result.passed { "next" } else { "repeat" };
        let target = step.transitions.get(intent).ok_or_else(|| {
            af_core::ConfigurationError::UnmappedIntent {
                step_id: step.step_id.clone(),
                intent: intent.to_string(),
            }
        })?;
        if target.is_closure() {
            Ok(NextStep::Closure)
        } else {
            Ok(NextStep::Step(target.target.clone()))
        }
    }

    /// Apply `next_step(result)` to the machine's mutable state
    /// (spec §4.9 `transition`).
    pub fn transition(&mut self, result: StepResult<'_>) -> Result<NextStep, StepFlowError> {
        let next = self.next_step(result)?;
        match &next {
            NextStep::Closure => {
                self.state.mark_complete("step_machine_closure");
            }
            NextStep::Step(target) if target == &self.state.current_step_id => {
                self.state.retry_count += 1;
            }
            NextStep::Step(target) => {
                self.state.retry_count = 0;
                self.state.transition_to(target.clone());
            }
        }
        Ok(next)
    }

    /// Extract the current step's intent and hand-off fields from `summary`,
    /// recording hand-off fields into the outputs store and transitioning.
    ///
    /// Returns `Err(IntentMissing)` when the gate yields no usable intent and
    /// `iteration > 1` (spec §4.9, §7).
    pub fn advance(&mut self, summary: &IterationSummary) -> Result<NextStep, StepFlowError> {
        self.last_summary = Some(summary.clone());
        let current_step_id = self.state.current_step_id.clone();
        let step = self.current_step();
        let gate = structured_gate::extract_intent(step, summary.structured_output.as_ref());

        let gate = match gate {
            Some(g) => g,
            None if summary.iteration > 1 => {
                return Err(StepFlowError::IntentMissing {
                    step_id: current_step_id,
                    iteration: summary.iteration,
                });
            }
            None => {
                return self.transition(StepResult {
                    step_id: &current_step_id,
                    passed: false,
                });
            }
        };

        if let Some(output) = &summary.structured_output {
            for (key, value) in structured_gate::extract_handoff(step, output) {
                self.state.set_output(current_step_id.as_str(), key, value);
            }
        }

        let passed = gate.intent == "next";
        self.transition(StepResult {
            step_id: &current_step_id,
            passed,
        })
    }

    /// Resolve the prompt for the current step's continuation turn, via
    /// `resolver`. On resolver failure, renders an inline fallback describing
    /// the current step rather than propagating the error (spec §4.9).
    ///
    /// `_prev` is accepted for call-site symmetry with `advance` (which
    /// consumes the same summary to transition state before this is
    /// called) but isn't otherwise needed here.
    pub async fn build_continuation_prompt(
        &mut self,
        completed_iterations: u32,
        _prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
        extra_vars: &HashMap<String, String>,
    ) -> String {
        self.state.total_iterations = completed_iterations;
        self.state.step_iteration += 1;

        let step = self.current_step();
        let path_stem = continuation_fallback_key(&step.fallback_key);

        match resolver.resolve(&path_stem, extra_vars).await {
            Ok(prompt) => prompt,
            Err(_) => format!(
                "Continuing step `{}` (iteration {}). No prompt template was available; \
                 proceed using the context already established in this session.",
                step.step_id, self.state.step_iteration
            ),
        }
    }

    /// Idempotent completion check (spec §4.9 `isComplete`): true once a
    /// closure transition has landed, or if the last recorded summary's
    /// structured output already signals completion.
    pub fn is_complete(&self) -> bool {
        if self.state.is_complete() {
            return true;
        }
        let Some(summary) = &self.last_summary else {
            return false;
        };
        let Some(output) = &summary.structured_output else {
            return false;
        };
        af_core::json_path::get_str(output, "status") == Some("completed")
            || output.get("complete").and_then(|v| v.as_bool()) == Some(true)
            || af_core::json_path::get_str(output, "next_action.action") == Some("complete")
    }
}
