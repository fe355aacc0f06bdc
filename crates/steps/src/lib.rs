// SPDX-License-Identifier: MIT

//! Step-flow machinery: the registry-driven state machine, structured-output
//! intent gate, hand-off store, and C3L/UV-variable prompt resolution.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod c3l;
pub mod error;
pub mod registry_loader;
pub mod step_context;
pub mod step_machine;
pub mod structured_gate;
pub mod uv_template;

pub use c3l::{continuation_fallback_key, prompt_path, prompt_stem};
pub use error::StepFlowError;
pub use registry_loader::{load as load_registry, RegistryLoadError};
pub use step_context::{StepContext, UvMapping};
pub use step_machine::{NextStep, StepMachine, StepResult};
pub use structured_gate::{extract_handoff, extract_intent, GateResult};
