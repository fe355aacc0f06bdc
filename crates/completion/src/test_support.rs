// SPDX-License-Identifier: MIT

//! In-crate test doubles, compiled only under `#[cfg(test)]`.

use af_core::{PromptResolutionError, PromptResolver};
use async_trait::async_trait;
use std::collections::HashMap;

/// A resolver that never has a template, forcing callers onto their fallback.
pub struct NoopResolver;

#[async_trait]
impl PromptResolver for NoopResolver {
    async fn resolve(
        &self,
        path_stem: &str,
        _variables: &HashMap<String, String>,
    ) -> Result<String, PromptResolutionError> {
        Err(PromptResolutionError::NotFound {
            step_id: path_stem.to_string(),
            path: path_stem.to_string(),
        })
    }
}
