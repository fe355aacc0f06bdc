// SPDX-License-Identifier: MIT

//! External capability seams (spec §4.6, §6.1, §9 "sub-process invocation").
//!
//! These traits describe everything the core needs from the outside world
//! without naming a concrete implementation. `af-adapters` provides the real
//! (and fake) implementations; `af-steps` and `af-completion` only ever see
//! `dyn` references to these traits.

use crate::issue_state::IssueState;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExternalProbeError {
    #[error("probe for issue #{issue_number} timed out")]
    Timeout { issue_number: u64 },
    #[error("probe for issue #{issue_number} failed: {message}")]
    Failed { issue_number: u64, message: String },
}

/// Side-effectful probe of an external issue-tracking resource (C1).
///
/// Implementations are expected to bound their own wait internally; a
/// timeout is reported as an error rather than left to the caller to detect.
#[async_trait]
pub trait ExternalStateChecker: Send + Sync {
    async fn check_issue_state(
        &self,
        repo: Option<&str>,
        issue_number: u64,
    ) -> Result<IssueState, ExternalProbeError>;

    /// List open items for a project, optionally filtered by label.
    async fn list_project_issues(
        &self,
        project_owner: Option<&str>,
        label_filter: Option<&str>,
        include_completed: bool,
    ) -> Result<Vec<IssueState>, ExternalProbeError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptResolutionError {
    #[error("no prompt file found for step `{step_id}` at `{path}`")]
    NotFound { step_id: String, path: String },
    #[error("failed to read prompt for step `{step_id}`: {message}")]
    ReadFailed { step_id: String, message: String },
}

/// Pure query: step key + variables → resolved prompt text (C2).
#[async_trait]
pub trait PromptResolver: Send + Sync {
    async fn resolve(
        &self,
        path_stem: &str,
        variables: &std::collections::HashMap<String, String>,
    ) -> Result<String, PromptResolutionError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoundaryHookError {
    #[error("failed to add label `{label}` to issue #{issue_number}: {message}")]
    AddLabelFailed {
        issue_number: u64,
        label: String,
        message: String,
    },
    #[error("failed to remove label `{label}` from issue #{issue_number}: {message}")]
    RemoveLabelFailed {
        issue_number: u64,
        label: String,
        message: String,
    },
    #[error("failed to close issue #{issue_number}: {message}")]
    CloseFailed { issue_number: u64, message: String },
}

/// External mutations performed by a `BoundaryHook` (C10, spec §6.4).
#[async_trait]
pub trait IssueOps: Send + Sync {
    async fn add_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError>;
    async fn remove_label(&self, issue_number: u64, label: &str) -> Result<(), BoundaryHookError>;
    async fn close_issue(&self, issue_number: u64) -> Result<(), BoundaryHookError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not resolve output schema `{schema_ref}`: {message}")]
pub struct SchemaResolutionError {
    pub schema_ref: String,
    pub message: String,
}

/// Resolves a step's `outputSchemaRef` (spec §3, §4.10, §7
/// `SchemaResolutionFailure`). The core only needs to know whether the
/// reference resolves at all — actual JSON-schema validation of the
/// model's output against the resolved schema is out of scope (spec §1).
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn resolve(&self, schema_ref: &str) -> Result<(), SchemaResolutionError>;
}
