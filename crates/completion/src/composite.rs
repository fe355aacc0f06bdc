// SPDX-License-Identifier: MIT

//! `CompositeHandler` (C6) — combines N sub-handlers under one operator
//! (spec §4.8).

use crate::handler::{BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;

/// How a composite's children combine into one completion verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOperator {
    And,
    Or,
    /// Same boolean result as `Or`; additionally records which child won.
    First,
}

impl CompositeOperator {
    pub fn parse(raw: &str) -> Result<Self, af_core::ConfigurationError> {
        match raw {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "first" => Ok(Self::First),
            other => Err(af_core::ConfigurationError::UnknownOperator(other.to_string())),
        }
    }
}

pub struct CompositeHandler {
    operator: CompositeOperator,
    children: Vec<Box<dyn CompletionHandler>>,
    /// Index of the first child to report complete, only tracked for `first`.
    completed_condition_index: Option<usize>,
}

impl CompositeHandler {
    pub fn new(operator: CompositeOperator, children: Vec<Box<dyn CompletionHandler>>) -> Self {
        Self {
            operator,
            children,
            completed_condition_index: None,
        }
    }

    pub fn completed_condition_index(&self) -> Option<usize> {
        self.completed_condition_index
    }
}

#[async_trait]
impl CompletionHandler for CompositeHandler {
    fn handler_type(&self) -> &'static str {
        "composite"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        match self.children.first() {
            Some(first) => first.build_initial_prompt(resolver).await,
            None => String::new(),
        }
    }

    async fn build_continuation_prompt(
        &mut self,
        iteration: u32,
        prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        match self.children.first_mut() {
            Some(first) => first.build_continuation_prompt(iteration, prev, resolver).await,
            None => String::new(),
        }
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        let sep = match self.operator {
            CompositeOperator::And => " AND ",
            CompositeOperator::Or | CompositeOperator::First => " OR ",
        };
        let mut shorts = Vec::with_capacity(self.children.len());
        let mut detaileds = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let criteria = child.build_completion_criteria();
            shorts.push(criteria.short);
            detaileds.push(criteria.detailed);
        }
        CompletionCriteria {
            short: shorts.join(sep),
            detailed: detaileds.join(sep),
        }
    }

    /// Evaluates every child (spec §5: "children may be evaluated in
    /// parallel"). Each child owns disjoint state, so running their futures
    /// concurrently via `join_all` is both safe and deterministic: the
    /// boolean result never depends on evaluation order.
    async fn is_complete(&mut self) -> bool {
        let results = futures::future::join_all(self.children.iter_mut().map(|c| c.is_complete())).await;
        match self.operator {
            CompositeOperator::And => results.iter().all(|&done| done),
            CompositeOperator::Or => results.iter().any(|&done| done),
            CompositeOperator::First => {
                let index = results.iter().position(|&done| done);
                self.completed_condition_index = index;
                index.is_some()
            }
        }
    }

    fn completion_description(&self) -> String {
        match self.operator {
            CompositeOperator::First => match self.completed_condition_index {
                Some(i) => format!(
                    "condition {} satisfied: {}",
                    i,
                    self.children[i].completion_description()
                ),
                None => "no condition satisfied yet".to_string(),
            },
            _ => self
                .children
                .iter()
                .map(|c| c.completion_description())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    fn set_current_summary(&mut self, summary: IterationSummary) {
        for child in &mut self.children {
            child.set_current_summary(summary.clone());
        }
    }

    fn set_current_iteration(&mut self, iteration: u32) {
        for child in &mut self.children {
            child.set_current_iteration(iteration);
        }
    }

    fn current_output_schema_ref(&self) -> Option<&str> {
        self.children.iter().find_map(|c| c.current_output_schema_ref())
    }

    fn current_step_id(&self) -> Option<&str> {
        self.children.iter().find_map(|c| c.current_step_id())
    }

    fn routing_failure(&self) -> Option<(String, u32)> {
        self.children.iter().find_map(|c| c.routing_failure())
    }

    async fn on_boundary_hook(&self, payload: &BoundaryPayload) {
        for child in &self.children {
            child.on_boundary_hook(payload).await;
        }
    }
}
