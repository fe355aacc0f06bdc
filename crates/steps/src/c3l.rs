// SPDX-License-Identifier: MIT

//! C3L prompt-file path resolution (spec §6.1).

use af_core::StepDefinition;
use std::path::PathBuf;

/// Build the prompt-file path for `step` under `user_prompts_base`, using
/// `c1` (the top-level coordinate; not stored on `StepDefinition` itself,
/// it names the agent/run family and is supplied by the caller).
pub fn prompt_path(user_prompts_base: &str, c1: &str, step: &StepDefinition) -> PathBuf {
    let mut path = PathBuf::from(user_prompts_base);
    path.push(c1);
    path.push(&step.c2);
    path.push(&step.c3);
    path.push(format!("{}.md", step.prompt_file_stem()));
    path
}

/// The same coordinate as `prompt_path`, rendered as a base-relative, bare
/// `PromptResolver` path stem (no `user_prompts_base`, no `.md` extension) —
/// the form every `PromptResolver::resolve` call in this workspace takes.
pub fn prompt_stem(c1: &str, step: &StepDefinition) -> String {
    format!("{}/{}/{}/{}", c1, step.c2, step.c3, step.prompt_file_stem())
}

/// Rewrite a `fallbackKey` from its initial-turn form to its continuation
/// form, per `StepMachine::buildContinuationPrompt` (spec §4.9): the first
/// occurrence of `"initial"` becomes `"continuation"`. Keys with no
/// `"initial"` substring are returned unchanged.
pub fn continuation_fallback_key(fallback_key: &str) -> String {
    fallback_key.replacen("initial", "continuation", 1)
}
