// SPDX-License-Identifier: MIT

//! Concrete and fake implementations of the `af-core` capability traits
//! (`PromptResolver`, `ExternalStateChecker`, `IssueOps`) — the boundary
//! between the completion/step-flow core and the outside world (spec §1,
//! §6.1, §6.4, §9 "sub-process invocation for boundary effects").

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod github;
pub mod prompt;
pub mod schema;
pub mod subprocess;

pub use github::GhCli;
pub use prompt::{FakePromptResolver, FsPromptResolver};
pub use schema::{AlwaysResolvableSchemaResolver, FsSchemaResolver};

#[cfg(any(test, feature = "test-support"))]
pub use github::fake::{FakeGitHub, IssueOpsCall};

#[cfg(any(test, feature = "test-support"))]
pub use schema::FakeSchemaResolver;
