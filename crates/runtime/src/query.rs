// SPDX-License-Identifier: MIT

//! `QueryFn` (spec §1, §4.10) — the LLM client seam `AgentLoop` drives.
//! Deliberately the only externally-supplied collaborator with no
//! production implementation in this workspace (spec §1: "the LLM client
//! itself ... is treated as QueryFn").

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// `previousSessionId`, carried only when the caller asked to resume
    /// (spec §4.10 step 3: `{resume: previousSessionId if options.resume}`).
    pub resume_session_id: Option<String>,
}

/// One streamed event from a `QueryFn` call (spec §4.10 step 3).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMessage {
    SessionId(String),
    AssistantText(String),
    ToolUse { name: String },
    ToolResultError(String),
    StructuredOutput(serde_json::Value),
}

pub type MessageStream = Pin<Box<dyn Stream<Item = Result<QueryMessage, String>> + Send>>;

/// Drives one model turn. `query` returns a stream rather than a
/// `Vec<QueryMessage>` so `AgentLoop` can fold messages as they arrive
/// (spec §5: "messages from a single QueryFn call are processed in the
/// order yielded").
#[async_trait]
pub trait QueryFn: Send + Sync {
    async fn query(&self, prompt: &str, options: QueryOptions) -> Result<MessageStream, String>;
}

/// Test double replaying a fixed script of turns, one `Vec` per call to
/// `query` — mirrors `af_adapters::github::fake::FakeGitHub`'s call-recording
/// shape, but for a streaming collaborator instead of a request/response one.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use futures::stream;
    use std::sync::Mutex;

    pub struct ScriptedQueryFn {
        turns: Mutex<std::collections::VecDeque<Vec<Result<QueryMessage, String>>>>,
    }

    impl ScriptedQueryFn {
        pub fn new(turns: Vec<Vec<Result<QueryMessage, String>>>) -> Self {
            Self {
                turns: Mutex::new(turns.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl QueryFn for ScriptedQueryFn {
        async fn query(&self, _prompt: &str, _options: QueryOptions) -> Result<MessageStream, String> {
            let turn = self
                .turns
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .ok_or_else(|| "no more scripted turns".to_string())?;
            Ok(Box::pin(stream::iter(turn)))
        }
    }
}
