// SPDX-License-Identifier: MIT

//! Construction-time factory: `{type, config}` → `Box<dyn CompletionHandler>`
//! (spec §6.3). A pure, total function except for the typed
//! `ConfigurationError` it returns for malformed or unrecognised config.

use crate::check_budget::CheckBudgetHandler;
use crate::composite::{CompositeHandler, CompositeOperator};
use crate::external_state::{BoundaryLabelConfig, IssueCompletionHandler};
use crate::facilitator::FacilitatorCompletionHandler;
use crate::handler::CompletionHandler;
use crate::iteration_budget::IterationBudgetHandler;
use crate::keyword_signal::KeywordSignalHandler;
use crate::phase_completion::PhaseCompletionHandler;
use crate::structured_signal::StructuredSignalHandler;
use af_core::{Clock, ConfigurationError, ExternalStateChecker, IssueOps};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One `{type, config}` pair from a declarative completion-handler config
/// (spec §6.3). `config` is permissive — each handler type picks its own
/// recognised keys out of the raw `Value` and ignores the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    #[serde(rename = "type")]
    pub handler_type: String,
    #[serde(default)]
    pub config: Value,
}

/// Capabilities and run-scoped values every handler type might need, kept
/// out of `HandlerConfig` because they don't come from declarative config
/// (spec §6.3: "issue number comes from run args, not config").
#[derive(Clone)]
pub struct HandlerDependencies {
    pub checker: Arc<dyn ExternalStateChecker>,
    pub issue_ops: Option<Arc<dyn IssueOps>>,
    pub clock: Arc<dyn Clock>,
    pub issue_number: Option<u64>,
    pub repo: Option<String>,
    pub boundary: BoundaryLabelConfig,
}

fn field<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    config.get(key)
}

fn required_str(
    config: &Value,
    key: &str,
    handler_type: &str,
) -> Result<String, ConfigurationError> {
    field(config, key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::MissingField {
            handler_type: handler_type.to_string(),
            field: key.to_string(),
        })
}

fn required_u32(config: &Value, key: &str, handler_type: &str) -> Result<u32, ConfigurationError> {
    field(config, key)
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .ok_or_else(|| ConfigurationError::MissingField {
            handler_type: handler_type.to_string(),
            field: key.to_string(),
        })
}

fn optional_u32(config: &Value, key: &str) -> Option<u32> {
    field(config, key).and_then(Value::as_u64).map(|n| n as u32)
}

fn optional_str(config: &Value, key: &str) -> Option<String> {
    field(config, key).and_then(Value::as_str).map(str::to_string)
}

fn optional_bool(config: &Value, key: &str) -> bool {
    field(config, key).and_then(Value::as_bool).unwrap_or(false)
}

fn optional_fields_map(config: &Value, key: &str) -> HashMap<String, Value> {
    field(config, key)
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Construct one handler from its `{type, config}` pair (spec §6.3), pulling
/// any capability it needs out of `deps`.
pub fn build_handler(
    entry: &HandlerConfig,
    deps: &HandlerDependencies,
) -> Result<Box<dyn CompletionHandler>, ConfigurationError> {
    match entry.handler_type.as_str() {
        "iterationBudget" => {
            let max_iterations = required_u32(&entry.config, "maxIterations", "iterationBudget")?;
            Ok(Box::new(IterationBudgetHandler::new(max_iterations)))
        }
        "keywordSignal" => {
            let keyword = required_str(&entry.config, "completionKeyword", "keywordSignal")?;
            Ok(Box::new(KeywordSignalHandler::new(keyword)))
        }
        "structuredSignal" => {
            let signal_type = required_str(&entry.config, "signalType", "structuredSignal")?;
            let required_fields = optional_fields_map(&entry.config, "requiredFields");
            Ok(Box::new(StructuredSignalHandler::new(signal_type, required_fields)))
        }
        "checkBudget" => {
            let max_checks = required_u32(&entry.config, "maxChecks", "checkBudget")?;
            Ok(Box::new(CheckBudgetHandler::new(max_checks)))
        }
        "facilitator" => {
            let signal_type = optional_str(&entry.config, "signalType")
                .unwrap_or_else(|| "facilitator_complete".to_string());
            let max_checks = optional_u32(&entry.config, "maxChecks");
            Ok(Box::new(FacilitatorCompletionHandler::new(signal_type, max_checks)))
        }
        "externalState" => {
            let issue_number =
                deps.issue_number
                    .ok_or_else(|| ConfigurationError::MissingField {
                        handler_type: "externalState".to_string(),
                        field: "issueNumber".to_string(),
                    })?;
            let check_interval_ms = optional_u32(&entry.config, "checkInterval").map(u64::from);
            Ok(Box::new(IssueCompletionHandler::new(
                issue_number,
                deps.repo.clone(),
                check_interval_ms,
                deps.checker.clone(),
                deps.issue_ops.clone(),
                deps.clock.clone(),
                deps.boundary.clone(),
            )))
        }
        "phaseCompletion" => {
            let project_owner = optional_str(&entry.config, "projectOwner");
            let label_filter = optional_str(&entry.config, "labelFilter");
            let include_completed = optional_bool(&entry.config, "includeCompleted");
            Ok(Box::new(PhaseCompletionHandler::new(
                project_owner,
                label_filter,
                include_completed,
                deps.checker.clone(),
                deps.issue_ops.clone(),
                deps.clock.clone(),
                deps.boundary.clone(),
            )))
        }
        "composite" => {
            let operator_str = required_str(&entry.config, "operator", "composite")?;
            let operator = CompositeOperator::parse(&operator_str)?;
            let conditions = field(&entry.config, "conditions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let mut children = Vec::with_capacity(conditions.len());
            for condition in &conditions {
                let child_entry: HandlerConfig =
                    serde_json::from_value(condition.clone()).map_err(|_| {
                        ConfigurationError::MissingField {
                            handler_type: "composite".to_string(),
                            field: "conditions[].type".to_string(),
                        }
                    })?;
                children.push(build_handler(&child_entry, deps)?);
            }
            Ok(Box::new(CompositeHandler::new(operator, children)))
        }
        other => Err(ConfigurationError::UnknownHandlerType(other.to_string())),
    }
}
