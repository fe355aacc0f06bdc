// SPDX-License-Identifier: MIT

//! `StepState` — the mutable run-time position of one agent loop (spec §3).

use serde_json::Value;
use std::collections::HashMap;

/// Per-run mutable state threaded through every iteration of the agent loop.
///
/// `isComplete` is a one-way latch: once set it is never cleared, matching
/// the spec's "completion is irreversible within a run" invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepState {
    pub current_step_id: String,
    /// Iterations spent on the current step, reset to 0 on every transition.
    pub step_iteration: u32,
    /// Iterations spent across the whole run, never reset.
    pub total_iterations: u32,
    pub retry_count: u32,
    is_complete: bool,
    pub completion_reason: Option<String>,
    /// Hand-off outputs recorded per step, in the order each step ran.
    /// Append-only: a step's entry is never overwritten, only inserted once.
    outputs: HashMap<String, HashMap<String, Value>>,
}

impl StepState {
    pub fn new(entry_step_id: impl Into<String>) -> Self {
        Self {
            current_step_id: entry_step_id.into(),
            step_iteration: 0,
            total_iterations: 0,
            retry_count: 0,
            is_complete: false,
            completion_reason: None,
            outputs: HashMap::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Latch completion. A second call with a different reason is a no-op:
    /// the first reason recorded wins.
    pub fn mark_complete(&mut self, reason: impl Into<String>) {
        if !self.is_complete {
            self.is_complete = true;
            self.completion_reason = Some(reason.into());
        }
    }

    pub fn record_iteration(&mut self) {
        self.step_iteration += 1;
        self.total_iterations += 1;
    }

    /// Move to `next_step_id`, resetting the per-step iteration counter.
    pub fn transition_to(&mut self, next_step_id: impl Into<String>) {
        self.current_step_id = next_step_id.into();
        self.step_iteration = 0;
    }

    /// Record one hand-off field for the given step. Existing keys for that
    /// step are updated in place; the step-to-output mapping itself is
    /// append-only in the sense that no step's bucket is ever dropped.
    pub fn set_output(&mut self, step_id: impl Into<String>, key: impl Into<String>, value: Value) {
        self.outputs
            .entry(step_id.into())
            .or_default()
            .insert(key.into(), value);
    }

    pub fn get_output(&self, step_id: &str, key: &str) -> Option<&Value> {
        self.outputs.get(step_id)?.get(key)
    }

    pub fn outputs_for(&self, step_id: &str) -> Option<&HashMap<String, Value>> {
        self.outputs.get(step_id)
    }
}
