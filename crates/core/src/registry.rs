// SPDX-License-Identifier: MIT

//! `StepsRegistry` — the loaded, immutable step graph (spec §3, §6.2).

use crate::error::ConfigurationError;
use crate::step_def::{StepDefinition, AMBIGUOUS_CLOSURE_SENTINEL, CLOSURE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The full registry of steps for one agent definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsRegistry {
    pub agent_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas_base: Option<String>,
    pub user_prompts_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_step: Option<String>,
    #[serde(default)]
    pub entry_step_mapping: HashMap<String, String>,
    pub steps: HashMap<String, StepDefinition>,
    /// Patterns consumed by the validator-based retry mechanism (spec §7);
    /// opaque to the core beyond being carried through.
    #[serde(default)]
    pub completion_patterns: Vec<String>,
    #[serde(default)]
    pub validators: Vec<String>,
}

impl StepsRegistry {
    /// Resolve the entry step for a given input mode, falling back to the
    /// registry-wide `entryStep` when no mode-specific mapping exists.
    pub fn entry_step_for_mode(&self, mode: Option<&str>) -> Option<&str> {
        if let Some(mode) = mode {
            if let Some(step_id) = self.entry_step_mapping.get(mode) {
                return Some(step_id.as_str());
            }
        }
        self.entry_step.as_deref()
    }

    /// Validate all invariants from spec §3. Must be called once after
    /// loading; every other operation assumes a validated registry.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let has_entry_step = self
            .entry_step
            .as_ref()
            .is_some_and(|id| self.steps.contains_key(id));
        let has_entry_mapping = self
            .entry_step_mapping
            .values()
            .any(|id| self.steps.contains_key(id));
        if !has_entry_step && !has_entry_mapping {
            if let Some(id) = &self.entry_step {
                if !self.steps.contains_key(id) {
                    return Err(ConfigurationError::UnknownEntryStep(id.clone()));
                }
            }
            return Err(ConfigurationError::MissingEntryStep);
        }

        let mut saw_closure = false;
        let mut saw_ambiguous = false;

        for step in self.steps.values() {
            if step.structured_gate.allowed_intents.is_empty() {
                return Err(ConfigurationError::MissingStructuredGate {
                    step_id: step.step_id.clone(),
                });
            }
            if step.transitions.is_empty() {
                return Err(ConfigurationError::MissingTransitions {
                    step_id: step.step_id.clone(),
                });
            }

            if !step
                .structured_gate
                .allowed_intents
                .contains(&step.structured_gate.fallback_intent)
            {
                return Err(ConfigurationError::FallbackIntentNotAllowed {
                    step_id: step.step_id.clone(),
                    intent: step.structured_gate.fallback_intent.clone(),
                });
            }

            for intent in &step.structured_gate.allowed_intents {
                if !step.transitions.contains_key(intent) {
                    return Err(ConfigurationError::UnmappedIntent {
                        step_id: step.step_id.clone(),
                        intent: intent.clone(),
                    });
                }
            }

            for (intent, transition) in &step.transitions {
                if transition.target == AMBIGUOUS_CLOSURE_SENTINEL {
                    saw_ambiguous = true;
                    continue;
                }
                if transition.target == CLOSURE {
                    saw_closure = true;
                    continue;
                }
                if !self.steps.contains_key(&transition.target) {
                    return Err(ConfigurationError::UnknownTransitionTarget {
                        step_id: step.step_id.clone(),
                        intent: intent.clone(),
                        target: transition.target.clone(),
                    });
                }
            }
        }

        if saw_ambiguous {
            return Err(ConfigurationError::AmbiguousClosureSentinel);
        }
        let _ = saw_closure; // every completion path must reach closure eventually; reachability
                             // beyond direct transitions is a traversal property, not a load-time one.

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step_def::{CustomVariable, StructuredGateConfig, TransitionTarget};
    use std::collections::HashMap;

    fn step(id: &str, intents: &[&str], fallback: &str, targets: &[(&str, &str)]) -> StepDefinition {
        StepDefinition {
            step_id: id.to_string(),
            name: id.to_string(),
            c2: "agent".to_string(),
            c3: "test".to_string(),
            edition: "initial".to_string(),
            adaptation: None,
            fallback_key: id.to_string(),
            uses_stdin: false,
            uv_variables: vec![],
            custom_variables: Vec::<CustomVariable>::new(),
            structured_gate: StructuredGateConfig {
                allowed_intents: intents.iter().map(|s| s.to_string()).collect(),
                intent_field: "next_action.action".to_string(),
                intent_schema_ref: None,
                fallback_intent: fallback.to_string(),
                handoff_fields: vec![],
            },
            transitions: targets
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        TransitionTarget {
                            target: v.to_string(),
                        },
                    )
                })
                .collect(),
            model: None,
            output_schema_ref: None,
        }
    }

    fn registry(steps: Vec<StepDefinition>, entry: &str) -> StepsRegistry {
        let mut map = HashMap::new();
        for s in steps {
            map.insert(s.step_id.clone(), s);
        }
        StepsRegistry {
            agent_id: "demo".to_string(),
            version: "1".to_string(),
            path_template: None,
            schemas_base: None,
            user_prompts_base: "/prompts".to_string(),
            entry_step: Some(entry.to_string()),
            entry_step_mapping: HashMap::new(),
            steps: map,
            completion_patterns: Vec::new(),
            validators: Vec::new(),
        }
    }

    #[test]
    fn valid_two_step_registry_passes() {
        let reg = registry(
            vec![
                step(
                    "initial.test",
                    &["next", "repeat"],
                    "repeat",
                    &[("next", "continuation.test"), ("repeat", "initial.test")],
                ),
                step(
                    "continuation.test",
                    &["next", "repeat"],
                    "repeat",
                    &[("next", "closure"), ("repeat", "continuation.test")],
                ),
            ],
            "initial.test",
        );
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn missing_entry_step_is_rejected() {
        let reg = registry(vec![], "nope");
        assert_eq!(reg.validate(), Err(ConfigurationError::UnknownEntryStep("nope".to_string())));
    }

    #[test]
    fn unmapped_allowed_intent_is_rejected() {
        let reg = registry(
            vec![step(
                "initial.test",
                &["next", "repeat"],
                "repeat",
                &[("repeat", "initial.test")],
            )],
            "initial.test",
        );
        assert_eq!(
            reg.validate(),
            Err(ConfigurationError::UnmappedIntent {
                step_id: "initial.test".to_string(),
                intent: "next".to_string(),
            })
        );
    }

    #[test]
    fn fallback_intent_must_be_allowed() {
        let reg = registry(
            vec![step(
                "initial.test",
                &["next"],
                "repeat",
                &[("next", "closure")],
            )],
            "initial.test",
        );
        assert_eq!(
            reg.validate(),
            Err(ConfigurationError::FallbackIntentNotAllowed {
                step_id: "initial.test".to_string(),
                intent: "repeat".to_string(),
            })
        );
    }

    #[test]
    fn unknown_transition_target_is_rejected() {
        let reg = registry(
            vec![step(
                "initial.test",
                &["next"],
                "next",
                &[("next", "ghost.step")],
            )],
            "initial.test",
        );
        assert_eq!(
            reg.validate(),
            Err(ConfigurationError::UnknownTransitionTarget {
                step_id: "initial.test".to_string(),
                intent: "next".to_string(),
                target: "ghost.step".to_string(),
            })
        );
    }

    #[test]
    fn ambiguous_closure_sentinel_is_rejected() {
        let reg = registry(
            vec![step(
                "initial.test",
                &["next"],
                "next",
                &[("next", "complete")],
            )],
            "initial.test",
        );
        assert_eq!(reg.validate(), Err(ConfigurationError::AmbiguousClosureSentinel));
    }

    #[test]
    fn entry_step_mapping_can_substitute_for_entry_step() {
        let mut reg = registry(
            vec![step(
                "initial.test",
                &["next"],
                "next",
                &[("next", "closure")],
            )],
            "unused",
        );
        reg.entry_step = None;
        reg.entry_step_mapping
            .insert("issue".to_string(), "initial.test".to_string());
        assert!(reg.validate().is_ok());
        assert_eq!(reg.entry_step_for_mode(Some("issue")), Some("initial.test"));
    }
}
