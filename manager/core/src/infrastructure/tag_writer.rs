// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Tag Writer adapters
//!
//! The cloud tagging calls themselves live outside this crate. These adapters
//! make an enforcement run observable without touching any cloud account:
//!
//! - [`DryRunTagWriter`] logs the call each action would turn into.
//! - [`PlanFileTagWriter`] appends one JSON line per action to a plan file
//!   that an external runner can replay.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::enforcement::{EnforcementAction, TagWriteError, TagWriter, WriteSemantics};

/// Describe-API style name of the call that applies `action`.
pub fn api_call_name(semantics: WriteSemantics) -> &'static str {
    match semantics {
        WriteSemantics::Additive => "CreateTags",
        WriteSemantics::FullReplace => "PutBucketTagging",
        WriteSemantics::AdditiveByArn => "AddTagsToResource",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTagWriter;

#[async_trait]
impl TagWriter for DryRunTagWriter {
    async fn write_tags(&self, action: &EnforcementAction) -> Result<(), TagWriteError> {
        info!(
            call = api_call_name(action.semantics()),
            target = %action.write_target,
            tags = ?action.tags_to_write,
            "[dry-run] would write tags"
        );
        Ok(())
    }
}

/// One line of a plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedWrite {
    pub call: String,
    pub semantics: WriteSemantics,
    #[serde(flatten)]
    pub action: EnforcementAction,
}

pub struct PlanFileTagWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PlanFileTagWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TagWriter for PlanFileTagWriter {
    async fn write_tags(&self, action: &EnforcementAction) -> Result<(), TagWriteError> {
        let semantics = action.semantics();
        let line = PlannedWrite {
            call: api_call_name(semantics).to_string(),
            semantics,
            action: action.clone(),
        };
        let mut encoded =
            serde_json::to_vec(&line).map_err(|e| TagWriteError::Rejected(e.to_string()))?;
        encoded.push(b'\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| TagWriteError::Transport(e.to_string()))?;
        file.write_all(&encoded)
            .await
            .map_err(|e| TagWriteError::Transport(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| TagWriteError::Transport(e.to_string()))?;
        Ok(())
    }
}
