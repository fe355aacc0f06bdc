// SPDX-License-Identifier: MIT

//! `RunError` — fatal, run-terminating conditions (spec §7). Locally
//! recoverable conditions (`ExternalProbeFailure`, `BoundaryHookFailure`,
//! prompt-resolver misses) never surface here; they're absorbed where they
//! occur and logged at `warn`.

use thiserror::Error;

/// A stable short tag for user-visible failure reporting (spec §7: "a
/// stable short tag ... plus a descriptive message").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("schema `{schema_ref}` failed to resolve twice in a row: {message}")]
    SchemaResolutionFailure { schema_ref: String, message: String },

    #[error("structured gate yielded no intent on iteration {iteration} (step `{step_id}`)")]
    IntentMissing { step_id: String, iteration: u32 },

    #[error("query stream failed on iteration {iteration}: {message}")]
    QueryStreamError { iteration: u32, message: String },

    #[error("hard iteration cap ({cap}) reached")]
    HardCapReached { cap: u32 },
}

impl RunError {
    /// The stable short tag spec §7 requires for user-visible reporting.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SchemaResolutionFailure { .. } => "FAILED_SCHEMA_RESOLUTION",
            Self::IntentMissing { .. } => "FAILED_STEP_ROUTING",
            Self::QueryStreamError { .. } => "FAILED_QUERY_STREAM",
            Self::HardCapReached { .. } => "emergency_stop",
        }
    }
}
