// SPDX-License-Identifier: MIT

//! `StructuredGate` (C8) — intent + hand-off extraction from structured output.

use af_core::{json_path, StepDefinition};
use serde_json::Value;

/// Result of reading a step's structured gate against one turn's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub intent: String,
    /// `true` if the model's own value was used; `false` if `fallbackIntent`
    /// was substituted because the field was missing or not allowed.
    pub used_model_intent: bool,
}

/// Extract the intent for `step` from `structured_output`.
///
/// Reads `structuredGate.intentField` as a dotted path. If the value is
/// present and listed in `allowedIntents`, it's used as-is. Otherwise
/// `fallbackIntent` is substituted (the registry guarantees it is itself
/// allowed). Returns `None` only when `structured_output` is absent
/// entirely — callers decide iteration-1-vs-later handling (spec §4.9).
pub fn extract_intent(step: &StepDefinition, structured_output: Option<&Value>) -> Option<GateResult> {
    let output = structured_output?;
    let gate = &step.structured_gate;
    let model_intent = json_path::get_str(output, &gate.intent_field);

    match model_intent {
        Some(intent) if gate.allowed_intents.iter().any(|i| i == intent) => Some(GateResult {
            intent: intent.to_string(),
            used_model_intent: true,
        }),
        _ => Some(GateResult {
            intent: gate.fallback_intent.clone(),
            used_model_intent: false,
        }),
    }
}

/// Read each of `handoffFields` from `structured_output` and return the
/// ones present, ready for `StepContext::set`.
pub fn extract_handoff(step: &StepDefinition, structured_output: &Value) -> Vec<(String, Value)> {
    step.structured_gate
        .handoff_fields
        .iter()
        .filter_map(|field| json_path::get(structured_output, field).map(|v| (field.clone(), v.clone())))
        .collect()
}
