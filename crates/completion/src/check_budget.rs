// SPDX-License-Identifier: MIT

//! `CheckBudget` strategy (spec §4.5) — identical in shape to
//! `IterationBudget`, but the counter advances only on
//! `buildContinuationPrompt`, never from the loop's raw iteration count.

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

pub struct CheckBudgetHandler {
    checks_done: u32,
    max_checks: u32,
}

impl CheckBudgetHandler {
    pub fn new(max_checks: u32) -> Self {
        Self {
            checks_done: 0,
            max_checks,
        }
    }
}

#[async_trait]
impl CompletionHandler for CheckBudgetHandler {
    fn handler_type(&self) -> &'static str {
        "checkBudget"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/check-budget",
            &HashMap::new(),
            "Begin monitoring the task.".to_string(),
        )
        .await
    }

    async fn build_continuation_prompt(
        &mut self,
        _iteration: u32,
        _prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        self.checks_done += 1;
        resolve_or_fallback(
            resolver,
            "completion/check-budget-continuation",
            &HashMap::new(),
            format!(
                "Check {} of {}: continue monitoring.",
                self.checks_done, self.max_checks
            ),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        let short = format!("{} checks", self.max_checks);
        CompletionCriteria {
            detailed: short.clone(),
            short,
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.checks_done >= self.max_checks
    }

    fn completion_description(&self) -> String {
        format!("{}/{} checks used", self.checks_done, self.max_checks)
    }

    fn set_current_summary(&mut self, _summary: IterationSummary) {}

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}
