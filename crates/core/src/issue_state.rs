// SPDX-License-Identifier: MIT

//! `IssueState` — a throttled, cached snapshot of external issue state (spec §3, §4.6).

use serde::{Deserialize, Serialize};

/// Last-known state of an externally tracked issue.
///
/// Produced by an `ExternalStateChecker` and consumed by the `ExternalState`
/// completion strategy; never constructed by hand in production code, only
/// refreshed wholesale on each successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueState {
    pub number: u64,
    pub closed: bool,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Epoch-milliseconds timestamp of the probe that produced this snapshot.
    pub last_checked: u64,
}

impl IssueState {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_label_matches_exact_name() {
        let issue = IssueState {
            number: 42,
            closed: false,
            title: "example".to_string(),
            state: "open".to_string(),
            labels: vec!["needs-review".to_string()],
            last_checked: 1_000,
        };
        assert!(issue.has_label("needs-review"));
        assert!(!issue.has_label("blocked"));
    }
}
