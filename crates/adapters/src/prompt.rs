// SPDX-License-Identifier: MIT

//! Filesystem-backed `PromptResolver` (C2, spec §6.1) and its in-memory fake.

use af_core::{PromptResolutionError, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Resolves a C3L `path_stem` (e.g. `issue-agent/agent/review/f_v2_strict`,
/// see `af_steps::c3l::prompt_stem`) to the `.md` file under `base` and
/// substitutes `{{uv-<name>}}` / `{uv-<name>}` placeholders from `variables`.
pub struct FsPromptResolver {
    base: PathBuf,
}

impl FsPromptResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn file_path(&self, path_stem: &str) -> PathBuf {
        self.base.join(format!("{path_stem}.md"))
    }
}

/// Replace `{{uv-<name>}}` and `{uv-<name>}` placeholders; unknown names are
/// left verbatim (spec §6.1), mirroring `af_steps::uv_template::interpolate`
/// without pulling in a dependency this crate doesn't otherwise need.
fn interpolate(template: &str, variables: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (name, value) in variables {
        rendered = rendered.replace(&format!("{{{{uv-{name}}}}}"), value);
        rendered = rendered.replace(&format!("{{uv-{name}}}"), value);
    }
    rendered
}

#[async_trait]
impl PromptResolver for FsPromptResolver {
    async fn resolve(
        &self,
        path_stem: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, PromptResolutionError> {
        let path = self.file_path(path_stem);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(interpolate(&raw, variables)),
            Err(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                Err(PromptResolutionError::NotFound {
                    step_id: path_stem.to_string(),
                    path: path.display().to_string(),
                })
            }
            Err(io_err) => Err(PromptResolutionError::ReadFailed {
                step_id: path_stem.to_string(),
                message: io_err.to_string(),
            }),
        }
    }
}

/// In-memory `PromptResolver` keyed by the exact `path_stem`, for tests that
/// don't need a scratch filesystem directory.
#[derive(Default)]
pub struct FakePromptResolver {
    templates: Mutex<HashMap<String, String>>,
}

impl FakePromptResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(self, path_stem: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.lock().unwrap_or_else(|e| e.into_inner()).insert(path_stem.into(), template.into());
        self
    }

    pub fn set_template(&self, path_stem: impl Into<String>, template: impl Into<String>) {
        self.templates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path_stem.into(), template.into());
    }
}

#[async_trait]
impl PromptResolver for FakePromptResolver {
    async fn resolve(
        &self,
        path_stem: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, PromptResolutionError> {
        let templates = self.templates.lock().unwrap_or_else(|e| e.into_inner());
        match templates.get(path_stem) {
            Some(template) => Ok(interpolate(template, variables)),
            None => Err(PromptResolutionError::NotFound {
                step_id: path_stem.to_string(),
                path: path_stem.to_string(),
            }),
        }
    }
}
