// SPDX-License-Identifier: MIT

//! `StructuredSignal` strategy (spec §4.4).
//!
//! Open Question 2 is resolved per `SPEC_FULL.md` §9.2: `requiredFields` is
//! checked against both the primary (`signal`/`type`) match and the
//! status-based fallback match, not only the fallback.

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub struct StructuredSignalHandler {
    signal_type: String,
    required_fields: HashMap<String, Value>,
    last_summary: Option<IterationSummary>,
}

impl StructuredSignalHandler {
    pub fn new(signal_type: impl Into<String>, required_fields: HashMap<String, Value>) -> Self {
        Self {
            signal_type: signal_type.into(),
            required_fields,
            last_summary: None,
        }
    }

    fn required_fields_match(&self, output: &Value) -> bool {
        self.required_fields
            .iter()
            .all(|(key, expected)| output.get(key) == Some(expected))
    }

    fn signal_matches(&self, output: &Value) -> bool {
        let primary = output.get("signal").and_then(Value::as_str) == Some(self.signal_type.as_str())
            || output.get("type").and_then(Value::as_str) == Some(self.signal_type.as_str());
        let fallback = output.get("status").and_then(Value::as_str) == Some("completed")
            || output.get("result").and_then(Value::as_str) == Some("complete");
        primary || fallback
    }
}

#[async_trait]
impl CompletionHandler for StructuredSignalHandler {
    fn handler_type(&self) -> &'static str {
        "structuredSignal"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/structured-signal",
            &HashMap::new(),
            format!(
                "Work on the task. Emit structured output with signal \"{}\" once finished.",
                self.signal_type
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
            "completion/structured-signal-continuation",
            &HashMap::new(),
            format!(
                "Continue the task, emitting signal \"{}\" once finished.",
                self.signal_type
            ),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        CompletionCriteria {
            short: format!("signal \"{}\"", self.signal_type),
            detailed: format!(
                "Complete when structured output reports signal \"{}\" (required fields: {:?})",
                self.signal_type, self.required_fields
            ),
        }
    }

    async fn is_complete(&mut self) -> bool {
        let Some(output) = self
            .last_summary
            .as_ref()
            .and_then(|s| s.structured_output.as_ref())
        else {
            return false;
        };
        self.signal_matches(output) && self.required_fields_match(output)
    }

    fn completion_description(&self) -> String {
        format!("awaiting signal \"{}\"", self.signal_type)
    }

    fn set_current_summary(&mut self, summary: IterationSummary) {
        self.last_summary = Some(summary);
    }

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}
