// SPDX-License-Identifier: MIT

//! Step-flow errors (spec §7: `ConfigurationError`, `IntentMissing`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepFlowError {
    #[error(transparent)]
    Configuration(#[from] af_core::ConfigurationError),

    #[error("step `{step_id}` produced no usable intent on iteration {iteration} (> 1)")]
    IntentMissing { step_id: String, iteration: u32 },
}
