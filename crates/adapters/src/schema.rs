// SPDX-License-Identifier: MIT

//! Filesystem-backed `SchemaResolver` (spec §4.10, §7 `SchemaResolutionFailure`)
//! and its in-memory fake, mirroring [`crate::prompt::FsPromptResolver`].
//!
//! Resolution only checks that the file named by `schemaRef` exists and
//! parses as JSON; validating a model's structured output *against* the
//! schema is out of scope (spec §1).

use af_core::{SchemaResolutionError, SchemaResolver};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct FsSchemaResolver {
    base: PathBuf,
}

impl FsSchemaResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn file_path(&self, schema_ref: &str) -> PathBuf {
        self.base.join(schema_ref)
    }
}

#[async_trait]
impl SchemaResolver for FsSchemaResolver {
    async fn resolve(&self, schema_ref: &str) -> Result<(), SchemaResolutionError> {
        let path = self.file_path(schema_ref);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| SchemaResolutionError {
                schema_ref: schema_ref.to_string(),
                message: format!("{} not readable: {err}", path.display()),
            })?;
        serde_json::from_str::<serde_json::Value>(&raw).map_err(|err| SchemaResolutionError {
            schema_ref: schema_ref.to_string(),
            message: format!("{} is not valid JSON: {err}", path.display()),
        })?;
        Ok(())
    }
}

/// Always resolves, for runs with no schema-bearing steps or tests that
/// don't exercise the fail-fast path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysResolvableSchemaResolver;

#[async_trait]
impl SchemaResolver for AlwaysResolvableSchemaResolver {
    async fn resolve(&self, _schema_ref: &str) -> Result<(), SchemaResolutionError> {
        Ok(())
    }
}

/// Resolves only the refs named at construction time; everything else
/// fails, for tests exercising the `AgentLoop` fail-fast/hard-terminate path.
#[derive(Default)]
pub struct FakeSchemaResolver {
    resolvable: Mutex<HashSet<String>>,
}

impl FakeSchemaResolver {
    pub fn new(resolvable: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            resolvable: Mutex::new(resolvable.into_iter().map(Into::into).collect()),
        }
    }

    pub fn none_resolvable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaResolver for FakeSchemaResolver {
    async fn resolve(&self, schema_ref: &str) -> Result<(), SchemaResolutionError> {
        if self
            .resolvable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(schema_ref)
        {
            Ok(())
        } else {
            Err(SchemaResolutionError {
                schema_ref: schema_ref.to_string(),
                message: "no such schema registered".to_string(),
            })
        }
    }
}
