// SPDX-License-Identifier: MIT

//! `ExternalState` (Issue) strategy (spec §4.6).

use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{Clock, ExternalStateChecker, IssueOps, IssueState, IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Labels to add/remove and the default closure action, carried from
/// `github.labels.completion.*` / `github.defaultClosureAction` config
/// (spec §6.4).
#[derive(Debug, Clone, Default)]
pub struct BoundaryLabelConfig {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub label_only: bool,
}

pub struct IssueCompletionHandler {
    issue_number: u64,
    repo: Option<String>,
    check_interval_ms: u64,
    checker: Arc<dyn ExternalStateChecker>,
    issue_ops: Option<Arc<dyn IssueOps>>,
    clock: Arc<dyn Clock>,
    boundary: BoundaryLabelConfig,
    cached_state: Option<IssueState>,
    last_refresh_at: Option<u64>,
}

/// Default polling interval when `checkInterval` is not configured: one minute.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60_000;

impl IssueCompletionHandler {
    pub fn new(
        issue_number: u64,
        repo: Option<String>,
        check_interval_ms: Option<u64>,
        checker: Arc<dyn ExternalStateChecker>,
        issue_ops: Option<Arc<dyn IssueOps>>,
        clock: Arc<dyn Clock>,
        boundary: BoundaryLabelConfig,
    ) -> Self {
        Self {
            issue_number,
            repo,
            check_interval_ms: check_interval_ms.unwrap_or(DEFAULT_CHECK_INTERVAL_MS),
            checker,
            issue_ops,
            clock,
            boundary,
            cached_state: None,
            last_refresh_at: None,
        }
    }

    /// Probe at most once per `checkInterval`; leaves the cache untouched on
    /// probe failure (spec §4.6).
    pub async fn refresh_state(&mut self) {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_refresh_at {
            if now.saturating_sub(last) < self.check_interval_ms {
                return;
            }
        }
        self.force_refresh_state().await;
    }

    /// Ignore the interval; always probe.
    pub async fn force_refresh_state(&mut self) {
        match self
            .checker
            .check_issue_state(self.repo.as_deref(), self.issue_number)
            .await
        {
            Ok(state) => {
                self.last_refresh_at = Some(self.clock.now_ms());
                self.cached_state = Some(state);
            }
            Err(error) => {
                tracing::warn!(issue_number = self.issue_number, %error, "external probe failed");
            }
        }
    }

    pub fn issue_number(&self) -> u64 {
        self.issue_number
    }

    /// Pure query over cached state; no probing (spec §4.6 `check`).
    pub fn check(&self) -> (bool, Option<String>) {
        match &self.cached_state {
            Some(state) if state.closed => (true, Some(format!("issue #{} is closed", state.number))),
            Some(_) => (false, None),
            None => (false, None),
        }
    }
}

#[async_trait]
impl CompletionHandler for IssueCompletionHandler {
    fn handler_type(&self) -> &'static str {
        "externalState"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/external-state",
            &HashMap::new(),
            format!("Work on issue #{} until it is closed.", self.issue_number),
        )
        .await
    }

    async fn build_continuation_prompt(
        &mut self,
        _iteration: u32,
        _prev: Option<&IterationSummary>,
        resolver: &dyn PromptResolver,
    ) -> String {
        resolve_or_fallback(
            resolver,
            "completion/external-state-continuation",
            &HashMap::new(),
            format!("Continue working on issue #{}.", self.issue_number),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        CompletionCriteria {
            short: format!("issue #{} closed", self.issue_number),
            detailed: format!(
                "Complete when issue #{} transitions to closed",
                self.issue_number
            ),
        }
    }

    async fn is_complete(&mut self) -> bool {
        self.refresh_state().await;
        self.check().0
    }

    fn completion_description(&self) -> String {
        match &self.cached_state {
            Some(state) if state.closed => format!("issue #{} is closed", self.issue_number),
            Some(_) => format!("issue #{} still open", self.issue_number),
            None => format!("issue #{} not yet checked", self.issue_number),
        }
    }

    fn set_current_summary(&mut self, _summary: IterationSummary) {}

    async fn on_boundary_hook(&self, _payload: &BoundaryPayload) {
        let Some(ops) = &self.issue_ops else {
            return;
        };
        for label in &self.boundary.add {
            if let Err(error) = ops.add_label(self.issue_number, label).await {
                tracing::warn!(issue_number = self.issue_number, label, %error, "boundary label add failed");
            }
        }
        for label in &self.boundary.remove {
            if let Err(error) = ops.remove_label(self.issue_number, label).await {
                tracing::warn!(issue_number = self.issue_number, label, %error, "boundary label remove failed");
            }
        }
        if !self.boundary.label_only {
            if let Err(error) = ops.close_issue(self.issue_number).await {
                tracing::warn!(issue_number = self.issue_number, %error, "boundary issue close failed");
            }
        }
    }
}
