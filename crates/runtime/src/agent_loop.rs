// SPDX-License-Identifier: MIT

//! `AgentLoop` (C9, spec §4.10) — the outer driver: build prompt → invoke
//! `QueryFn` → capture summary → ask the handler if complete → advance the
//! step → emit log events, until completion, a fatal error, or the hard cap.

use crate::error::RunError;
use crate::log::{EventSink, LogEvent, LogLevel};
use crate::query::{MessageStream, QueryFn, QueryMessage, QueryOptions};
use af_completion::{BoundaryPayload, CompletionHandler};
use af_core::{Clock, IterationSummary, PromptResolver, SchemaResolver};
use futures::StreamExt;
use std::sync::Arc;

/// Independent of any handler-declared budget (spec §9 Open Question 5).
pub const HARD_ITERATION_CAP: u32 = 100;

pub struct AgentLoop {
    handler: Box<dyn CompletionHandler>,
    query_fn: Arc<dyn QueryFn>,
    prompt_resolver: Arc<dyn PromptResolver>,
    schema_resolver: Arc<dyn SchemaResolver>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    /// Whether to pass `previousSessionId` to `QueryFn` as `options.resume`
    /// (spec §4.10 step 3).
    resume: bool,
    hard_cap: u32,
}

/// What a run produced, once the loop exits without a fatal error.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub iterations: u32,
    pub last_summary: Option<IterationSummary>,
    pub completion_description: String,
}

impl AgentLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handler: Box<dyn CompletionHandler>,
        query_fn: Arc<dyn QueryFn>,
        prompt_resolver: Arc<dyn PromptResolver>,
        schema_resolver: Arc<dyn SchemaResolver>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        resume: bool,
    ) -> Self {
        Self {
            handler,
            query_fn,
            prompt_resolver,
            schema_resolver,
            clock,
            sink,
            resume,
            hard_cap: HARD_ITERATION_CAP,
        }
    }

    /// Override the hard cap, for tests exercising the emergency-stop path
    /// without 100 scripted turns.
    pub fn with_hard_cap(mut self, cap: u32) -> Self {
        self.hard_cap = cap;
        self
    }

    fn emit(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.emit(LogEvent::new(self.clock.now_ms(), level, message));
    }

    async fn fold_stream(
        &self,
        mut stream: MessageStream,
        summary: &mut IterationSummary,
        iteration: u32,
    ) -> Result<(), RunError> {
        while let Some(item) = stream.next().await {
            match item {
                Ok(QueryMessage::SessionId(id)) => summary.session_id = Some(id),
                Ok(QueryMessage::AssistantText(text)) => summary.push_assistant_text(text),
                Ok(QueryMessage::ToolUse { name }) => summary.record_tool_use(name),
                Ok(QueryMessage::ToolResultError(error)) => summary.push_error(error),
                Ok(QueryMessage::StructuredOutput(value)) => summary.structured_output = Some(value),
                Err(message) => return Err(RunError::QueryStreamError { iteration, message }),
            }
        }
        Ok(())
    }

    /// Run until completion or a fatal error (spec §4.10).
    pub async fn run(&mut self) -> Result<RunOutcome, RunError> {
        let mut current_prompt = self
            .handler
            .build_initial_prompt(self.prompt_resolver.as_ref())
            .await;
        let mut previous_session_id: Option<String> = None;
        let mut iteration_count: u32 = 0;
        let mut schema_failure_streak: u32 = 0;
        let mut last_summary: Option<IterationSummary> = None;

        loop {
            let i = iteration_count + 1;
            if i > self.hard_cap {
                self.emit(LogLevel::Error, format!("hard iteration cap ({}) reached", self.hard_cap));
                return Err(RunError::HardCapReached { cap: self.hard_cap });
            }

            if let Some(schema_ref) = self.handler.current_output_schema_ref().map(str::to_string) {
                if let Err(err) = self.schema_resolver.resolve(&schema_ref).await {
                    schema_failure_streak += 1;
                    self.emit(
                        LogLevel::Warn,
                        format!("schema `{}` unresolved (streak {}): {}", schema_ref, schema_failure_streak, err),
                    );
                    if schema_failure_streak >= 2 {
                        return Err(RunError::SchemaResolutionFailure {
                            schema_ref,
                            message: err.message,
                        });
                    }
                    // Iteration aborted (spec §4.10): skip invoking QueryFn this
                    // pass and retry once the schema is (hopefully) resolvable.
                    iteration_count = i;
                    continue;
                }
                schema_failure_streak = 0;
            }

            self.emit(LogLevel::Info, format!("Starting iteration {i}"));
            let mut summary = IterationSummary::new(i);

            let options = QueryOptions {
                resume_session_id: if self.resume { previous_session_id.clone() } else { None },
            };
            let stream = self
                .query_fn
                .query(&current_prompt, options)
                .await
                .map_err(|message| RunError::QueryStreamError { iteration: i, message })?;
            self.fold_stream(stream, &mut summary, i).await?;

            iteration_count = i;
            self.handler.set_current_iteration(iteration_count);
            self.handler.set_current_summary(summary.clone());
            let complete = self.handler.is_complete().await;
            self.emit(LogLevel::Info, format!("iteration {i} complete"));
            self.emit(LogLevel::Info, format!("completion decision: {complete}"));

            previous_session_id = summary.session_id.clone();
            last_summary = Some(summary.clone());

            if complete {
                break;
            }

            current_prompt = self
                .handler
                .build_continuation_prompt(iteration_count, Some(&summary), self.prompt_resolver.as_ref())
                .await;

            if let Some((step_id, at)) = self.handler.routing_failure() {
                return Err(RunError::IntentMissing { step_id, iteration: at });
            }
        }

        let structured_output = last_summary.as_ref().and_then(|s| s.structured_output.clone());
        let step_id = self.handler.current_step_id().unwrap_or_default().to_string();
        let payload = BoundaryPayload::closure(step_id, structured_output);
        self.emit(LogLevel::Info, "invoking boundary hook");
        self.handler.on_boundary_hook(&payload).await;

        let completion_description = self.handler.completion_description();
        self.emit(LogLevel::Result, format!("run complete: {completion_description}"));

        Ok(RunOutcome {
            iterations: iteration_count,
            last_summary,
            completion_description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RecordingEventSink;
    use crate::query::fake::ScriptedQueryFn;
    use af_completion::IterationBudgetHandler;
    use af_core::{FakeClock, SchemaResolutionError};
    use af_adapters::{AlwaysResolvableSchemaResolver, FakePromptResolver};
    use async_trait::async_trait;
    use serde_json::json;

    fn deps() -> (Arc<dyn PromptResolver>, Arc<dyn SchemaResolver>, Arc<dyn Clock>, Arc<RecordingEventSink>) {
        (
            Arc::new(FakePromptResolver::new()),
            Arc::new(AlwaysResolvableSchemaResolver),
            Arc::new(FakeClock::new(0)),
            Arc::new(RecordingEventSink::new()),
        )
    }

    #[tokio::test]
    async fn runs_until_budget_handler_reports_complete() {
        let handler = Box::new(IterationBudgetHandler::new(2));
        let query_fn = Arc::new(ScriptedQueryFn::new(vec![
            vec![Ok(QueryMessage::AssistantText("one".to_string()))],
            vec![Ok(QueryMessage::AssistantText("two".to_string()))],
        ]));
        let (resolver, schema, clock, sink) = deps();
        let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
        let outcome = agent_loop.run().await.unwrap();
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn query_stream_error_is_fatal() {
        let handler = Box::new(IterationBudgetHandler::new(5));
        let query_fn = Arc::new(ScriptedQueryFn::new(vec![vec![Err("boom".to_string())]]));
        let (resolver, schema, clock, sink) = deps();
        let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false);
        let err = agent_loop.run().await.unwrap_err();
        assert!(matches!(err, RunError::QueryStreamError { iteration: 1, .. }));
    }

    #[tokio::test]
    async fn hard_cap_terminates_an_unbounded_handler() {
        let handler = Box::new(IterationBudgetHandler::new(u32::MAX));
        let turns = (0..5)
            .map(|_| vec![Ok(QueryMessage::AssistantText("go".to_string()))])
            .collect();
        let query_fn = Arc::new(ScriptedQueryFn::new(turns));
        let (resolver, schema, clock, sink) = deps();
        let mut agent_loop =
            AgentLoop::new(handler, query_fn, resolver, schema, clock, sink, false).with_hard_cap(3);
        let err = agent_loop.run().await.unwrap_err();
        assert_eq!(err, RunError::HardCapReached { cap: 3 });
    }

    struct SchemaStep {
        iteration: u32,
        summary: Option<IterationSummary>,
    }

    #[async_trait]
    impl CompletionHandler for SchemaStep {
        fn handler_type(&self) -> &'static str {
            "schemaStep"
        }
        async fn build_initial_prompt(&self, _resolver: &dyn PromptResolver) -> String {
            "go".to_string()
        }
        async fn build_continuation_prompt(
            &mut self,
            _iteration: u32,
            _prev: Option<&IterationSummary>,
            _resolver: &dyn PromptResolver,
        ) -> String {
            "go".to_string()
        }
        fn build_completion_criteria(&self) -> af_completion::CompletionCriteria {
            af_completion::CompletionCriteria {
                short: "schema".to_string(),
                detailed: "schema".to_string(),
            }
        }
        async fn is_complete(&mut self) -> bool {
            self.iteration >= 5
        }
        fn completion_description(&self) -> String {
            "schema step".to_string()
        }
        fn set_current_summary(&mut self, summary: IterationSummary) {
            self.summary = Some(summary);
        }
        fn set_current_iteration(&mut self, iteration: u32) {
            self.iteration = iteration;
        }
        fn current_output_schema_ref(&self) -> Option<&str> {
            Some("unresolvable.schema.json")
        }
    }

    struct NeverResolvable;

    #[async_trait]
    impl SchemaResolver for NeverResolvable {
        async fn resolve(&self, schema_ref: &str) -> Result<(), SchemaResolutionError> {
            Err(SchemaResolutionError {
                schema_ref: schema_ref.to_string(),
                message: "no such file".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn two_consecutive_schema_failures_terminate_the_run() {
        let handler = Box::new(SchemaStep { iteration: 0, summary: None });
        let query_fn = Arc::new(ScriptedQueryFn::new(vec![]));
        let (resolver, _schema, clock, sink) = deps();
        let mut agent_loop = AgentLoop::new(
            handler,
            query_fn,
            resolver,
            Arc::new(NeverResolvable),
            clock,
            sink,
            false,
        );
        let err = agent_loop.run().await.unwrap_err();
        assert!(matches!(err, RunError::SchemaResolutionFailure { .. }));
    }

    #[tokio::test]
    async fn boundary_hook_runs_once_on_completion() {
        let handler = Box::new(IterationBudgetHandler::new(1));
        let query_fn = Arc::new(ScriptedQueryFn::new(vec![vec![Ok(QueryMessage::StructuredOutput(
            json!({"done": true}),
        ))]]));
        let (resolver, schema, clock, sink) = deps();
        let mut agent_loop = AgentLoop::new(handler, query_fn, resolver, schema, clock, sink.clone(), false);
        agent_loop.run().await.unwrap();
        let events = sink.events();
        assert!(events.iter().any(|e| e.message.contains("boundary hook")));
    }
}
