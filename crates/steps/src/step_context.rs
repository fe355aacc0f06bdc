// SPDX-License-Identifier: MIT

//! Hand-off store and UV-variable projection (spec §4.9, §9 "prototype-style
//! hand-off store").

use af_core::StepState;
use serde_json::Value;
use std::collections::HashMap;

/// One `toUV` projection rule: bind `uv-<name>` to `outputs[step][key]`.
#[derive(Debug, Clone)]
pub struct UvMapping {
    pub name: String,
    pub from_step: String,
    pub from_key: String,
}

impl UvMapping {
    pub fn new(name: impl Into<String>, from: &str) -> Self {
        let (from_step, from_key) = from
            .split_once('.')
            .map(|(s, k)| (s.to_string(), k.to_string()))
            .unwrap_or_else(|| (from.to_string(), String::new()));
        Self {
            name: name.into(),
            from_step,
            from_key,
        }
    }
}

/// A read/write view over `StepState.outputs` (spec §4.9 `getStepContext`).
pub struct StepContext<'a> {
    state: &'a mut StepState,
}

impl<'a> StepContext<'a> {
    pub fn new(state: &'a mut StepState) -> Self {
        Self { state }
    }

    /// Record one hand-off field for `step_id`. Per spec §3, a given step's
    /// record is written at most once per traversal; callers that need to
    /// record several fields for the same step in one turn should call this
    /// once per field before the step transitions away.
    pub fn set(&mut self, step_id: &str, key: &str, value: Value) {
        self.state.set_output(step_id, key, value);
    }

    pub fn get(&self, step_id: &str, key: &str) -> Option<&Value> {
        self.state.get_output(step_id, key)
    }

    /// Project recorded outputs into a `uv-<name> -> String(value)` bag.
    ///
    /// A mapping whose source step/key was never recorded is omitted from
    /// the result rather than producing an empty string.
    pub fn to_uv(&self, mappings: &[UvMapping]) -> HashMap<String, String> {
        let mut out = HashMap::new();
        for mapping in mappings {
            if let Some(value) = self.state.get_output(&mapping.from_step, &mapping.from_key) {
                out.insert(format!("uv-{}", mapping.name), value_to_uv_string(value));
            }
        }
        out
    }
}

fn value_to_uv_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
