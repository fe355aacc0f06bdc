// SPDX-License-Identifier: MIT

//! Completion-condition strategies: the `CompletionHandler` trait, each
//! concrete strategy, the `CompositeHandler` combinator, and the
//! `StepFlowHandler` bridge into a registry-driven step machine.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod check_budget;
pub mod composite;
pub mod external_state;
pub mod facilitator;
pub mod factory;
pub mod handler;
pub mod iteration_budget;
pub mod keyword_signal;
pub mod phase_completion;
pub mod step_flow;
pub mod structured_signal;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use check_budget::CheckBudgetHandler;
pub use composite::{CompositeHandler, CompositeOperator};
pub use external_state::{BoundaryLabelConfig, IssueCompletionHandler, DEFAULT_CHECK_INTERVAL_MS};
pub use facilitator::{FacilitatorCompletionHandler, DEFAULT_FACILITATOR_MAX_CHECKS};
pub use factory::{build_handler, HandlerConfig, HandlerDependencies};
pub use handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
pub use iteration_budget::IterationBudgetHandler;
pub use keyword_signal::KeywordSignalHandler;
pub use phase_completion::{PhaseCompletionHandler, ProjectPhase};
pub use step_flow::{report_step_result, StepFlowHandler};
pub use structured_signal::StructuredSignalHandler;
