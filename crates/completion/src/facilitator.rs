// SPDX-License-Identifier: MIT

//! `FacilitatorCompletionHandler` — a check-budget-bounded structured signal,
//! for agents that facilitate rather than directly produce work (e.g. a
//! review/triage loop that polls a few times before yielding).
//!
//! This strategy has no direct antecedent in the retrieved material; it is
//! synthesized from `CheckBudget` (§4.5) and `StructuredSignal` (§4.4) per
//! Open Question 4 — see `DESIGN.md` for the resolution.

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

/// Default check budget when `maxChecks` is not configured (Open Question 4).
pub const DEFAULT_FACILITATOR_MAX_CHECKS: u32 = 10;

pub struct FacilitatorCompletionHandler {
    signal_type: String,
    checks_done: u32,
    max_checks: u32,
    last_summary: Option<IterationSummary>,
}

impl FacilitatorCompletionHandler {
    pub fn new(signal_type: impl Into<String>, max_checks: Option<u32>) -> Self {
        Self {
            signal_type: signal_type.into(),
            checks_done: 0,
            max_checks: max_checks.unwrap_or(DEFAULT_FACILITATOR_MAX_CHECKS),
            last_summary: None,
        }
    }

    fn signal_received(&self) -> bool {
        self.last_summary
            .as_ref()
            .and_then(|s| s.structured_output.as_ref())
            .and_then(|output| output.get("signal").and_then(serde_json::Value::as_str))
            .is_some_and(|signal| signal == self.signal_type)
    }
}

#[async_trait]
impl CompletionHandler for FacilitatorCompletionHandler {
    fn handler_type(&self) -> &'static str {
        "facilitator"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/facilitator",
            &HashMap::new(),
            format!(
                "Facilitate the task, checking in up to {} times. Emit signal \"{}\" once done.",
                self.max_checks, self.signal_type
            ),
        )
        .await
    }

    async fn build_continuation_prompt(
        &mut self,
        _iteration: u32,
        prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        if let Some(summary) = prev {
            self.last_summary = Some(summary.clone());
        }
        self.checks_done += 1;
        resolve_or_fallback(
            resolver,
            "completion/facilitator-continuation",
            &HashMap::new(),
            format!(
                "Check {} of {}: continue facilitating, or emit signal \"{}\".",
                self.checks_done, self.max_checks, self.signal_type
            ),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        CompletionCriteria {
            short: format!("signal \"{}\" or {} checks", self.signal_type, self.max_checks),
            detailed: format!(
                "Complete on signal \"{}\", or after {} checks, whichever comes first",
                self.signal_type, self.max_checks
            ),
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.signal_received() || self.checks_done >= self.max_checks
    }

    fn completion_description(&self) -> String {
        if self.signal_received() {
            format!("facilitator signal \"{}\" received", self.signal_type)
        } else {
            format!("{}/{} checks used", self.checks_done, self.max_checks)
        }
    }

    fn set_current_summary(&mut self, summary: IterationSummary) {
        self.last_summary = Some(summary);
    }

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}
