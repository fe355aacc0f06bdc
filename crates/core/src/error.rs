// SPDX-License-Identifier: MIT

//! Fatal error taxonomy (spec §7).
//!
//! `ConfigurationError` is fatal at construction time — a run never starts.
//! Non-fatal conditions (`ExternalProbeFailure`, `BoundaryHookFailure`) are
//! absorbed by the components that hit them and never surface as a typed
//! error; they're logged and replaced with a conservative default instead.

use thiserror::Error;

/// Errors that abort construction of a handler, step machine, or registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required field `{field}` for completion handler type `{handler_type}`")]
    MissingField {
        handler_type: String,
        field: String,
    },

    #[error("unknown completion handler type `{0}`")]
    UnknownHandlerType(String),

    #[error("unknown composite operator `{0}` (expected `and`, `or`, or `first`)")]
    UnknownOperator(String),

    #[error("steps registry has no entry step and no usable entryStepMapping")]
    MissingEntryStep,

    #[error("entry step `{0}` is not a defined step")]
    UnknownEntryStep(String),

    #[error("step `{step_id}` is non-terminal but declares no structuredGate")]
    MissingStructuredGate { step_id: String },

    #[error("step `{step_id}` is non-terminal but declares no transitions")]
    MissingTransitions { step_id: String },

    #[error("step `{step_id}` allows intent `{intent}` with no matching transition")]
    UnmappedIntent { step_id: String, intent: String },

    #[error("step `{step_id}` transition `{intent}` targets unknown step `{target}`")]
    UnknownTransitionTarget {
        step_id: String,
        intent: String,
        target: String,
    },

    #[error("step `{step_id}` fallbackIntent `{intent}` is not in allowedIntents")]
    FallbackIntentNotAllowed { step_id: String, intent: String },

    #[error(
        "registry uses both `\"complete\"` and `\"closure\"` as transition targets; \
         pick one canonical closure sentinel per registry version"
    )]
    AmbiguousClosureSentinel,
}
