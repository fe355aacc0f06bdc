// SPDX-License-Identifier: MIT

//! `gh`-CLI-backed `ExternalStateChecker` and `IssueOps` (spec §1 "GitHub
//! CLI invocation", §6.4), plumbed through [`crate::subprocess::run_with_timeout`]
//! the way the teacher wraps `tmux`/`git` subprocess calls.

use crate::subprocess::{run_with_timeout, GH_CLI_TIMEOUT};
use af_core::{BoundaryHookError, ExternalProbeError, ExternalStateChecker, IssueOps, IssueState};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::process::Command;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct GhIssueView {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

impl GhIssueView {
    fn into_issue_state(self) -> IssueState {
        IssueState {
            number: self.number,
            closed: self.state.eq_ignore_ascii_case("closed"),
            title: self.title,
            state: self.state,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            last_checked: now_ms(),
        }
    }
}

/// `ExternalStateChecker` + `IssueOps` backed by the real `gh` CLI binary.
///
/// Every call shells out via `tokio::process::Command`, bounded by
/// [`GH_CLI_TIMEOUT`]; a timeout or non-zero exit becomes a typed error,
/// never a panic.
#[derive(Debug, Clone, Default)]
pub struct GhCli;

impl GhCli {
    pub fn new() -> Self {
        Self
    }

    fn command(args: &[&str], repo: Option<&str>) -> Command {
        let mut cmd = Command::new("gh");
        cmd.args(args);
        if let Some(repo) = repo {
            cmd.args(["--repo", repo]);
        }
        cmd
    }
}

#[async_trait]
impl ExternalStateChecker for GhCli {
    async fn check_issue_state(
        &self,
        repo: Option<&str>,
        issue_number: u64,
    ) -> Result<IssueState, ExternalProbeError> {
        let number = issue_number.to_string();
        let cmd = Self::command(
            &[
                "issue",
                "view",
                &number,
                "--json",
                "number,title,state,labels",
            ],
            repo,
        );
        let output = run_with_timeout(cmd, GH_CLI_TIMEOUT, "gh issue view")
            .await
            .map_err(|message| ExternalProbeError::Failed {
                issue_number,
                message,
            })?;
        if !output.status.success() {
            return Err(ExternalProbeError::Failed {
                issue_number,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        serde_json::from_slice::<GhIssueView>(&output.stdout)
            .map(GhIssueView::into_issue_state)
            .map_err(|err| ExternalProbeError::Failed {
                issue_number,
                message: format!("could not parse `gh issue view` output: {err}"),
            })
    }

    async fn list_project_issues(
        &self,
        project_owner: Option<&str>,
        label_filter: Option<&str>,
        include_completed: bool,
    ) -> Result<Vec<IssueState>, ExternalProbeError> {
        let mut args = vec!["issue", "list", "--json", "number,title,state,labels"];
        if let Some(label) = label_filter {
            args.extend(["--label", label]);
        }
        if !include_completed {
            args.extend(["--state", "open"]);
        }
        let cmd = Self::command(&args, project_owner);
        let output = run_with_timeout(cmd, GH_CLI_TIMEOUT, "gh issue list")
            .await
            .map_err(|message| ExternalProbeError::Failed {
                issue_number: 0,
                message,
            })?;
        if !output.status.success() {
            return Err(ExternalProbeError::Failed {
                issue_number: 0,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        serde_json::from_slice::<Vec<GhIssueView>>(&output.stdout)
            .map(|issues| issues.into_iter().map(GhIssueView::into_issue_state).collect())
            .map_err(|err| ExternalProbeError::Failed {
                issue_number: 0,
                message: format!("could not parse `gh issue list` output: {err}"),
            })
    }
}

#[async_trait]
impl IssueOps for GhCli {
    async fn add_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError> {
        let number = issue_number.to_string();
        let cmd = Self::command(&["issue", "edit", &number, "--add-label", label], None);
        let output = run_with_timeout(cmd, GH_CLI_TIMEOUT, "gh issue edit --add-label")
            .await
            .map_err(|message| BoundaryHookError::AddLabelFailed {
                issue_number,
                label: label.to_string(),
                message,
            })?;
        if !output.status.success() {
            return Err(BoundaryHookError::AddLabelFailed {
                issue_number,
                label: label.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn remove_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError> {
        let number = issue_number.to_string();
        let cmd = Self::command(&["issue", "edit", &number, "--remove-label", label], None);
        let output = run_with_timeout(cmd, GH_CLI_TIMEOUT, "gh issue edit --remove-label")
            .await
            .map_err(|message| BoundaryHookError::RemoveLabelFailed {
                issue_number,
                label: label.to_string(),
                message,
            })?;
        if !output.status.success() {
            return Err(BoundaryHookError::RemoveLabelFailed {
                issue_number,
                label: label.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn close_issue(&self, issue_number: u64) -> Result<(), BoundaryHookError> {
        let number = issue_number.to_string();
        let cmd = Self::command(&["issue", "close", &number], None);
        let output = run_with_timeout(cmd, GH_CLI_TIMEOUT, "gh issue close")
            .await
            .map_err(|message| BoundaryHookError::CloseFailed {
                issue_number,
                message,
            })?;
        if !output.status.success() {
            return Err(BoundaryHookError::CloseFailed {
                issue_number,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory `ExternalStateChecker` + `IssueOps` double, recording every
/// mutation for test assertions (spec §9: "externalise its cache so that
/// tests can inject a `MockStateChecker`").
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum IssueOpsCall {
        AddLabel { issue_number: u64, label: String },
        RemoveLabel { issue_number: u64, label: String },
        CloseIssue { issue_number: u64 },
    }

    #[derive(Default)]
    pub struct FakeGitHub {
        pub issues: Mutex<Vec<IssueState>>,
        pub calls: Mutex<Vec<IssueOpsCall>>,
    }

    impl FakeGitHub {
        pub fn new(issues: Vec<IssueState>) -> Self {
            Self {
                issues: Mutex::new(issues),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<IssueOpsCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ExternalStateChecker for FakeGitHub {
        async fn check_issue_state(
            &self,
            _repo: Option<&str>,
            issue_number: u64,
        ) -> Result<IssueState, ExternalProbeError> {
            self.issues
                .lock()
                .iter()
                .find(|i| i.number == issue_number)
                .cloned()
                .ok_or(ExternalProbeError::Failed {
                    issue_number,
                    message: "unknown issue".to_string(),
                })
        }

        async fn list_project_issues(
            &self,
            _project_owner: Option<&str>,
            label_filter: Option<&str>,
            include_completed: bool,
        ) -> Result<Vec<IssueState>, ExternalProbeError> {
            Ok(self
                .issues
                .lock()
                .iter()
                .filter(|i| include_completed || !i.closed)
                .filter(|i| label_filter.is_none_or(|l| i.has_label(l)))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl IssueOps for FakeGitHub {
        async fn add_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError> {
            self.calls.lock().push(IssueOpsCall::AddLabel {
                issue_number,
                label: label.to_string(),
            });
            if let Some(issue) = self.issues.lock().iter_mut().find(|i| i.number == issue_number) {
                if !issue.labels.iter().any(|l| l == label) {
                    issue.labels.push(label.to_string());
                }
            }
            Ok(())
        }

        async fn remove_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError> {
            self.calls.lock().push(IssueOpsCall::RemoveLabel {
                issue_number,
                label: label.to_string(),
            });
            if let Some(issue) = self.issues.lock().iter_mut().find(|i| i.number == issue_number) {
                issue.labels.retain(|l| l != label);
            }
            Ok(())
        }

        async fn close_issue(&self, issue_number: u64) -> Result<(), BoundaryHookError> {
            self.calls.lock().push(IssueOpsCall::CloseIssue { issue_number });
            if let Some(issue) = self.issues.lock().iter_mut().find(|i| i.number == issue_number) {
                issue.closed = true;
                issue.state = "closed".to_string();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn closing_an_issue_flips_cached_state() {
        let gh = FakeGitHub::new(vec![IssueState {
            number: 7,
            closed: false,
            title: "demo".to_string(),
            state: "open".to_string(),
            labels: vec![],
            last_checked: 0,
        }]);
        gh.close_issue(7).await.unwrap();
        let state = gh.check_issue_state(None, 7).await.unwrap();
        assert!(state.closed);
        assert_eq!(gh.calls(), vec![IssueOpsCall::CloseIssue { issue_number: 7 }]);
    }

    #[tokio::test]
    async fn label_filter_narrows_project_listing() {
        let gh = FakeGitHub::new(vec![
            IssueState {
                number: 1,
                closed: false,
                title: "a".to_string(),
                state: "open".to_string(),
                labels: vec!["agent-ready".to_string()],
                last_checked: 0,
            },
            IssueState {
                number: 2,
                closed: false,
                title: "b".to_string(),
                state: "open".to_string(),
                labels: vec![],
                last_checked: 0,
            },
        ]);
        let filtered = gh
            .list_project_issues(None, Some("agent-ready"), false)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].number, 1);
    }
}
