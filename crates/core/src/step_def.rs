// SPDX-License-Identifier: MIT

//! Declarative step definitions (spec §3, §6.2).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a custom prompt variable's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomVariableSource {
    Stdin,
    Github,
    Computed,
    Parameter,
    Context,
}

/// A step-local prompt variable sourced from outside the `uvVariables` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariable {
    pub name: String,
    pub source: CustomVariableSource,
    #[serde(default)]
    pub required: bool,
}

/// Per-step override of the model tier used for the LLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sonnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haiku: Option<String>,
}

/// Structured-output intent extraction config for one step (spec §4.9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredGateConfig {
    pub allowed_intents: Vec<String>,
    /// Dotted path into `structuredOutput` where the intent string lives.
    pub intent_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_schema_ref: Option<String>,
    pub fallback_intent: String,
    #[serde(default)]
    pub handoff_fields: Vec<String>,
}

/// The transition target for one intent: another step, or the closure sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTarget {
    pub target: String,
}

/// Sentinel transition-target value meaning "terminal; invoke completion".
pub const CLOSURE: &str = "closure";

/// The (now-rejected) non-canonical closure sentinel (spec §9, Open Question 1).
pub const AMBIGUOUS_CLOSURE_SENTINEL: &str = "complete";

impl TransitionTarget {
    pub fn is_closure(&self) -> bool {
        self.target == CLOSURE
    }
}

/// One labelled state in the declarative step state machine (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub step_id: String,
    pub name: String,
    /// C3L coordinate used to locate this step's prompt file.
    pub c2: String,
    pub c3: String,
    pub edition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptation: Option<String>,
    pub fallback_key: String,
    #[serde(default)]
    pub uses_stdin: bool,
    #[serde(default)]
    pub uv_variables: Vec<String>,
    #[serde(default)]
    pub custom_variables: Vec<CustomVariable>,
    pub structured_gate: StructuredGateConfig,
    pub transitions: HashMap<String, TransitionTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelOverride>,
    /// Schema reference an output must validate against; unresolved schemas
    /// abort the iteration (spec §4.10, §7 `SchemaResolutionFailure`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema_ref: Option<String>,
}

impl StepDefinition {
    /// The C3L file stem for this step: `f_<edition>` or `f_<edition>_<adaptation>`.
    pub fn prompt_file_stem(&self) -> String {
        match &self.adaptation {
            Some(adaptation) => format!("f_{}_{}", self.edition, adaptation),
            None => format!("f_{}", self.edition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StepDefinition {
        StepDefinition {
            step_id: "initial.test".to_string(),
            name: "initial test".to_string(),
            c2: "agent".to_string(),
            c3: "test".to_string(),
            edition: "initial".to_string(),
            adaptation: None,
            fallback_key: "initial.test".to_string(),
            uses_stdin: false,
            uv_variables: vec![],
            custom_variables: vec![],
            structured_gate: StructuredGateConfig {
                allowed_intents: vec!["next".to_string(), "repeat".to_string()],
                intent_field: "next_action.action".to_string(),
                intent_schema_ref: None,
                fallback_intent: "repeat".to_string(),
                handoff_fields: vec![],
            },
            transitions: HashMap::new(),
            model: None,
            output_schema_ref: None,
        }
    }

    #[test]
    fn prompt_file_stem_without_adaptation() {
        assert_eq!(sample().prompt_file_stem(), "f_initial");
    }

    #[test]
    fn prompt_file_stem_with_adaptation() {
        let mut step = sample();
        step.adaptation = Some("strict".to_string());
        assert_eq!(step.prompt_file_stem(), "f_initial_strict");
    }

    #[test]
    fn closure_target_is_recognised() {
        let t = TransitionTarget {
            target: CLOSURE.to_string(),
        };
        assert!(t.is_closure());
    }
}
