// SPDX-License-Identifier: MIT

//! UV-variable interpolation in prompt templates (spec §6.1).

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Matches `{{uv-name}}`, capturing `name`.
#[allow(clippy::expect_used)]
static DOUBLE_BRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{uv-([a-zA-Z_][a-zA-Z0-9_-]*)\}\}").expect("constant regex pattern is valid")
});

/// Matches `{uv-name}`, capturing `name`.
#[allow(clippy::expect_used)]
static SINGLE_BRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{uv-([a-zA-Z_][a-zA-Z0-9_-]*)\}").expect("constant regex pattern is valid")
});

/// Substitute `{{uv-<name>}}` and `{uv-<name>}` placeholders from `vars`.
///
/// `vars` is keyed by the bare name (`x`, not `uv-x`). Unknown variables are
/// left verbatim, matching the placeholder syntax they appeared in.
pub fn interpolate(template: &str, vars: &HashMap<String, String>) -> String {
    let after_double = DOUBLE_BRACE_PATTERN.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        vars.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
    });
    SINGLE_BRACE_PATTERN
        .replace_all(&after_double, |caps: &regex::Captures| {
            let name = &caps[1];
            vars.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}
