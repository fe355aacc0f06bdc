// SPDX-License-Identifier: MIT

//! `CompletionHandler` (C4) — the Strategy interface every concrete
//! completion condition satisfies (spec §4.1).

use af_core::{IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

/// Human-readable description of a handler's completion condition, used for
/// system-prompt injection and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCriteria {
    pub short: String,
    pub detailed: String,
}

/// Payload passed to `onBoundaryHook` on entry into a terminal step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundaryPayload {
    pub step_id: String,
    pub step_kind: &'static str,
    pub structured_output: Option<serde_json::Value>,
}

impl BoundaryPayload {
    pub fn closure(step_id: impl Into<String>, structured_output: Option<serde_json::Value>) -> Self {
        Self {
            step_id: step_id.into(),
            step_kind: "closure",
            structured_output,
        }
    }
}

/// Uniform contract every completion strategy satisfies (spec §4.1).
///
/// Every operation is total except construction: constructors return a
/// typed `ConfigurationError` when mandatory config is missing, which is
/// fatal to the run before it starts.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Stable tag identifying the strategy, matching its `§6.3` config type.
    fn handler_type(&self) -> &'static str;

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String;

    /// `iteration` is the completed iteration count (≥ 1). Must incorporate
    /// `prev` into the returned prompt when it is `Some`.
    async fn build_continuation_prompt(
        &mut self,
        iteration: u32,
        prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String;

    fn build_completion_criteria(&self) -> CompletionCriteria;

    /// Purely reads state set by `set_current_summary` and prior calls,
    /// except where a strategy documents a bounded, throttled external
    /// probe (`ExternalState`, `PhaseCompletion`). Never invokes `QueryFn`.
    async fn is_complete(&mut self) -> bool;

    fn completion_description(&self) -> String;

    fn set_current_summary(&mut self, summary: IterationSummary);

    /// Report the current iteration count to budget-like strategies. A
    /// no-op for strategies that don't track a raw iteration counter.
    fn set_current_iteration(&mut self, _iteration: u32) {}

    /// The `outputSchemaRef` the active step (if any) declares, for
    /// `AgentLoop`'s schema fail-fast check (spec §4.10, §7). `None` for
    /// strategies with no notion of a current step.
    fn current_output_schema_ref(&self) -> Option<&str> {
        None
    }

    /// The active step id, for `AgentLoop`'s `BoundaryPayload` (spec §4.10
    /// step 9). `None` for strategies with no notion of a current step.
    fn current_step_id(&self) -> Option<&str> {
        None
    }

    /// Set by `build_continuation_prompt` when structured-gate intent
    /// extraction failed on iteration > 1 (spec §4.9, §7 `IntentMissing`).
    /// `AgentLoop` checks this immediately after the call and terminates
    /// the run with `FAILED_STEP_ROUTING` when it is `Some`.
    fn routing_failure(&self) -> Option<(String, u32)> {
        None
    }

    /// Best-effort; failures are logged by the implementation and never
    /// propagate to the caller (spec §6.4).
    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {}
}

/// Shared helper: resolve a handler's prompt via `resolver`, falling back to
/// `fallback` (typically a sentence built from the handler's own criteria)
/// when no template is registered for `prompt_key`.
pub async fn resolve_or_fallback(
    resolver: &dyn PromptResolver,
    prompt_key: &str,
    vars: &HashMap<String, String>,
    fallback: String,
) -> String {
    resolver.resolve(prompt_key, vars).await.unwrap_or(fallback)
}
