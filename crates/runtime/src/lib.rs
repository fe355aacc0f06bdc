// SPDX-License-Identifier: MIT

//! `AgentLoop` (C9) and `BoundaryHook` wiring (C10) — the outer driver that
//! turns a `CompletionHandler` and a `QueryFn` into a run (spec §4.10).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent_loop;
pub mod error;
pub mod log;
pub mod query;

pub use agent_loop::{AgentLoop, RunOutcome, HARD_ITERATION_CAP};
pub use error::RunError;
pub use log::{EventSink, LogEvent, LogLevel, RecordingEventSink, TracingEventSink};
pub use query::{MessageStream, QueryFn, QueryMessage, QueryOptions};

#[cfg(any(test, feature = "test-support"))]
pub use query::fake::ScriptedQueryFn;
