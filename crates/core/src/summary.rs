// SPDX-License-Identifier: MIT

//! `IterationSummary` — the immutable record of one completed `QueryFn` turn.

use serde_json::Value;
use std::collections::BTreeSet;

/// Everything observed during one iteration of the agent loop (spec §3).
///
/// Built incrementally by `AgentLoop` while streaming a `QueryFn` call, then
/// frozen and handed to the active `CompletionHandler` and to the next
/// `buildContinuationPrompt`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationSummary {
    /// Strictly monotone per run, starting at 1.
    pub iteration: u32,
    /// Opaque session identifier from the LLM client, if it supplied one.
    pub session_id: Option<String>,
    /// Text fragments emitted by the assistant, in emission order.
    pub assistant_responses: Vec<String>,
    /// Distinct tool names observed (insertion order doesn't matter to callers).
    pub tools_used: BTreeSet<String>,
    /// Tool-failure strings, in observation order.
    pub errors: Vec<String>,
    /// The model's parsed JSON reply, if any.
    pub structured_output: Option<Value>,
    pub final_result: Option<String>,
}

impl IterationSummary {
    /// Start an empty summary for the given iteration number.
    pub fn new(iteration: u32) -> Self {
        Self {
            iteration,
            ..Default::default()
        }
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.assistant_responses.push(text.into());
    }

    pub fn record_tool_use(&mut self, tool_name: impl Into<String>) {
        self.tools_used.insert(tool_name.into());
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Whether any assistant response contains `needle` as a substring.
    /// Case-sensitive, no regex — the contract `KeywordSignal` relies on.
    pub fn any_response_contains(&self, needle: &str) -> bool {
        self.assistant_responses.iter().any(|r| r.contains(needle))
    }
}
