// SPDX-License-Identifier: MIT

//! Loading a `StepsRegistry` from its JSON wire form (spec §6.2).

use af_core::{ConfigurationError, StepsRegistry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("failed to parse steps registry JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

/// Parse and validate a steps registry from its JSON text.
///
/// This is the only place a raw, unvalidated `StepsRegistry` is allowed to
/// exist; every caller downstream receives an already-validated value.
pub fn load(json: &str) -> Result<StepsRegistry, RegistryLoadError> {
    let registry: StepsRegistry = serde_json::from_str(json)?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_valid_registry() {
        let json = r#"{
            "agentId": "demo",
            "version": "1",
            "userPromptsBase": "/prompts",
            "entryStep": "initial.test",
            "steps": {
                "initial.test": {
                    "stepId": "initial.test",
                    "name": "initial",
                    "c2": "agent",
                    "c3": "test",
                    "edition": "initial",
                    "fallbackKey": "initial.test",
                    "structuredGate": {
                        "allowedIntents": ["next", "repeat"],
                        "intentField": "next_action.action",
                        "fallbackIntent": "repeat"
                    },
                    "transitions": {
                        "next": {"target": "closure"},
                        "repeat": {"target": "initial.test"}
                    }
                }
            }
        }"#;
        let registry = load(json).unwrap();
        assert_eq!(registry.agent_id, "demo");
        assert_eq!(registry.entry_step.as_deref(), Some("initial.test"));
    }

    #[test]
    fn rejects_registry_with_unresolvable_entry_step() {
        let json = r#"{
            "agentId": "demo",
            "version": "1",
            "userPromptsBase": "/prompts",
            "entryStep": "missing.step",
            "steps": {}
        }"#;
        assert!(load(json).is_err());
    }
}
