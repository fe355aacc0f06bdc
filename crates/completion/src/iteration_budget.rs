// SPDX-License-Identifier: MIT

//! `IterationBudget` strategy (spec §4.2).

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

pub struct IterationBudgetHandler {
    current_iteration: u32,
    max_iterations: u32,
}

impl IterationBudgetHandler {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            current_iteration: 0,
            max_iterations,
        }
    }
}

#[async_trait]
impl CompletionHandler for IterationBudgetHandler {
    fn handler_type(&self) -> &'static str {
        "iterationBudget"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/iteration-budget",
            &HashMap::new(),
            "Begin working toward the task at hand.".to_string(),
        )
        .await
    }

    async fn build_continuation_prompt(
        &mut self,
        iteration: u32,
        _prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        self.current_iteration = iteration;
        resolve_or_fallback(
            resolver,
            "completion/iteration-budget-continuation",
            &HashMap::new(),
            format!(
                "Continue (iteration {} of {}).",
                iteration, self.max_iterations
            ),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        let short = format!("{} iterations", self.max_iterations);
        CompletionCriteria {
            detailed: short.clone(),
            short,
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.current_iteration >= self.max_iterations
    }

    fn completion_description(&self) -> String {
        format!(
            "{}/{} iterations used",
            self.current_iteration, self.max_iterations
        )
    }

    fn set_current_summary(&mut self, _summary: IterationSummary) {}

    fn set_current_iteration(&mut self, iteration: u32) {
        self.current_iteration = iteration;
    }

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_exactly_at_the_budget_boundary_s1() {
        let mut handler = IterationBudgetHandler::new(3);
        handler.set_current_iteration(1);
        assert!(!handler.is_complete().await);
        handler.set_current_iteration(3);
        assert!(handler.is_complete().await);
    }

    #[tokio::test]
    async fn over_budget_also_counts_as_complete() {
        let mut handler = IterationBudgetHandler::new(3);
        handler.set_current_iteration(5);
        assert!(handler.is_complete().await);
    }
}
