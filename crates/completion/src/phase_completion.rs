// SPDX-License-Identifier: MIT

//! `PhaseCompletion` (Project) strategy (spec §4.7).
//!
//! Phase transitions (`setProjectPlan`/`advancePhase`/`setReviewResult`) are
//! exposed as explicit inherent methods rather than folded into
//! `CompletionHandler`, matching the finite-state table literally: they are
//! driven by a caller that already knows the project's out-of-band state
//! (e.g. a CLI command or webhook), not by the iteration loop itself.

use crate::external_state::{BoundaryLabelConfig, IssueCompletionHandler, DEFAULT_CHECK_INTERVAL_MS};
use crate::handler::{resolve_or_fallback, BoundaryPayload, CompletionCriteria, CompletionHandler};
use af_core::{Clock, ExternalStateChecker, IssueOps, IssueState, IterationSummary, PromptResolver};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPhase {
    Preparation,
    Processing,
    Review,
    Again,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewResult {
    Pass,
    Fail,
}

pub struct PhaseCompletionHandler {
    phase: ProjectPhase,
    project_owner: Option<String>,
    label_filter: Option<String>,
    include_completed: bool,
    checker: Arc<dyn ExternalStateChecker>,
    issue_ops: Option<Arc<dyn IssueOps>>,
    clock: Arc<dyn Clock>,
    boundary: BoundaryLabelConfig,
    project_plan: Option<String>,
    review_result: Option<ReviewResult>,
    queue: VecDeque<IssueState>,
    current_issue: Option<IssueCompletionHandler>,
    completed_issue_numbers: HashSet<u64>,
    issues_completed: u32,
    queue_primed: bool,
}

impl PhaseCompletionHandler {
    pub fn new(
        project_owner: Option<String>,
        label_filter: Option<String>,
        include_completed: bool,
        checker: Arc<dyn ExternalStateChecker>,
        issue_ops: Option<Arc<dyn IssueOps>>,
        clock: Arc<dyn Clock>,
        boundary: BoundaryLabelConfig,
    ) -> Self {
        Self {
            phase: ProjectPhase::Preparation,
            project_owner,
            label_filter,
            include_completed,
            checker,
            issue_ops,
            clock,
            boundary,
            project_plan: None,
            review_result: None,
            queue: VecDeque::new(),
            current_issue: None,
            completed_issue_numbers: HashSet::new(),
            issues_completed: 0,
            queue_primed: false,
        }
    }

    pub fn phase(&self) -> ProjectPhase {
        self.phase
    }

    pub fn issues_completed(&self) -> u32 {
        self.issues_completed
    }

    pub fn set_project_plan(&mut self, plan: impl Into<String>) {
        self.project_plan = Some(plan.into());
    }

    pub fn set_review_result(&mut self, result: ReviewResult) {
        self.review_result = Some(result);
    }

    /// Drives the phase table (spec §4.7). `review` with no result recorded
    /// advances to `again`, matching the table's third `review` row.
    pub fn advance_phase(&mut self) {
        self.phase = match self.phase {
            ProjectPhase::Preparation => ProjectPhase::Processing,
            ProjectPhase::Processing => ProjectPhase::Review,
            ProjectPhase::Review => match self.review_result.take() {
                Some(ReviewResult::Pass) => ProjectPhase::Complete,
                Some(ReviewResult::Fail) | None => ProjectPhase::Again,
            },
            ProjectPhase::Again => ProjectPhase::Review,
            ProjectPhase::Complete => ProjectPhase::Complete,
        };
    }

    async fn probe_open_issues(&self) -> Vec<IssueState> {
        match self
            .checker
            .list_project_issues(
                self.project_owner.as_deref(),
                self.label_filter.as_deref(),
                self.include_completed,
            )
            .await
        {
            Ok(issues) => issues,
            Err(error) => {
                tracing::warn!(%error, "project issue probe failed");
                Vec::new()
            }
        }
    }

    fn make_current(&self, issue: &IssueState) -> IssueCompletionHandler {
        IssueCompletionHandler::new(
            issue.number,
            self.project_owner.clone(),
            None,
            self.checker.clone(),
            self.issue_ops.clone(),
            self.clock.clone(),
            self.boundary.clone(),
        )
    }

    /// Advances the queue/current-issue bookkeeping for one `isComplete`
    /// call while in `processing` (spec §4.7 "Queue management").
    async fn advance_processing(&mut self) -> bool {
        if !self.queue_primed {
            self.queue = self.probe_open_issues().await.into();
            self.queue_primed = true;
            if let Some(next) = self.queue.pop_front() {
                self.current_issue = Some(self.make_current(&next));
            }
        }

        let Some(handler) = self.current_issue.as_mut() else {
            return self.queue.is_empty() && self.probe_open_issues().await.is_empty();
        };

        if !handler.is_complete().await {
            return false;
        }

        if self.completed_issue_numbers.insert(handler.issue_number()) {
            self.issues_completed += 1;
        }

        match self.queue.pop_front() {
            Some(next) => {
                self.current_issue = Some(self.make_current(&next));
                false
            }
            None => {
                let reprobed = self.probe_open_issues().await;
                if reprobed.is_empty() {
                    self.current_issue = None;
                    true
                } else {
                    self.queue = reprobed.into();
                    if let Some(next) = self.queue.pop_front() {
                        self.current_issue = Some(self.make_current(&next));
                    }
                    false
                }
            }
        }
    }
}

#[async_trait]
impl CompletionHandler for PhaseCompletionHandler {
    fn handler_type(&self) -> &'static str {
        "phaseCompletion"
    }

    async fn build_initial_prompt(&self, resolver: &dyn PromptResolver) -> String {
        resolve_or_fallback(
            resolver,
            "completion/phase-completion",
            &std::collections::HashMap::new(),
            "Prepare a project plan, then advance through processing and review.".to_string(),
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
            "completion/phase-completion-continuation",
            &std::collections::HashMap::new(),
            format!("Continue the project; current phase: {:?}.", self.phase),
        )
        .await
    }

    fn build_completion_criteria(&self) -> CompletionCriteria {
        CompletionCriteria {
            short: "project phases complete".to_string(),
            detailed: "Complete when the project reaches the `review` phase with a passing result"
                .to_string(),
        }
    }

    async fn is_complete(&mut self) -> bool {
        match self.phase {
            ProjectPhase::Processing => {
                if self.advance_processing().await {
                    self.advance_phase();
                }
                false
            }
            ProjectPhase::Complete => true,
            _ => false,
        }
    }

    fn completion_description(&self) -> String {
        format!(
            "phase {:?}, {} issue(s) completed",
            self.phase, self.issues_completed
        )
    }

    fn set_current_summary(&mut self, _summary: IterationSummary) {}

    async fn on_boundary_hook(&self, payload: &BoundaryPayload) {
        if let Some(handler) = &self.current_issue {
            handler.on_boundary_hook(payload).await;
        }
    }
}
