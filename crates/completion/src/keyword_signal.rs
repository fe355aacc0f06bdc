// SPDX-License-Identifier: MIT

//! `KeywordSignal` strategy (spec §4.3).

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

pub struct KeywordSignalHandler {
    completion_keyword: String,
    last_summary: Option<IterationSummary>,
}

impl KeywordSignalHandler {
    pub fn new(completion_keyword: impl Into<String>) -> Self {
        Self {
            completion_keyword: completion_keyword.into(),
            last_summary: None,
        }
    }
}

#[async_trait]
impl CompletionHandler for KeywordSignalHandler {
    fn handler_type(&self) -> &'static str {
        "keywordSignal"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/keyword-signal",
            &HashMap::new(),
            format!(
                "Work on the task. Reply with \"{}\" once it is finished.",
                self.completion_keyword
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
        resolve_or_fallback(
            resolver,
            "completion/keyword-signal-continuation",
            &HashMap::new(),
            format!(
                "Continue the task. Reply with \"{}\" once it is finished.",
                self.completion_keyword
            ),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        let short = format!("keyword \"{}\"", self.completion_keyword);
        CompletionCriteria {
            detailed: format!(
                "Complete when an assistant response contains \"{}\"",
                self.completion_keyword
            ),
            short,
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.last_summary
            .as_ref()
            .is_some_and(|s| s.any_response_contains(&self.completion_keyword))
    }

    fn completion_description(&self) -> String {
        if self.last_summary.is_some() {
            format!("watching for keyword \"{}\"", self.completion_keyword)
        } else {
            "no turns observed yet".to_string()
        }
    }

    fn set_current_summary(&mut self, summary: IterationSummary) {
        self.last_summary = Some(summary);
    }

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}
