// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Typed access to the document store.
//!
//! Wraps a [`DocumentStore`] with the key conventions used by the manager so
//! the rest of the application deals in policies, snapshots and analyses
//! rather than raw JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::analysis::{AnalysisRecord, TagAnalysis};
use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::org::{OrgDirectoryDocument, OrgLookup, OrgProductDocument};
use crate::domain::policy::TagPolicyConfig;
use crate::domain::repository::{
    DocumentStore, RepositoryError, ORG_DIRECTORY_KEY, ORG_PRODUCTS_KEY, POLICY_KEY,
};
use crate::domain::resource::{RawResourceDocument, ResourceSnapshot, ResourceType};

#[derive(Clone)]
pub struct TagRecords {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventSink>,
}

impl TagRecords {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Load and validate the tag policy. A missing or invalid policy is fatal.
    pub async fn load_policy(&self) -> Result<TagPolicyConfig> {
        let document = self
            .store
            .get(POLICY_KEY)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(POLICY_KEY.to_string()))
            .context("No tag policy stored; load one before analysing")?;
        let policy = TagPolicyConfig::from_document(&document)
            .with_context(|| format!("Stored policy under {} is invalid", POLICY_KEY))?;
        Ok(policy)
    }

    /// Store a policy document after validating it.
    pub async fn store_policy(&self, document: &Value) -> Result<TagPolicyConfig> {
        let policy = TagPolicyConfig::from_document(document)?;
        self.store.put(POLICY_KEY, document).await?;
        info!(tags = policy.len(), "Stored tag policy");
        Ok(policy)
    }

    /// Org lookup for database association; empty when nothing is stored.
    pub async fn load_org_lookup(&self) -> Result<OrgLookup> {
        let directory: OrgDirectoryDocument = match self.store.get(ORG_DIRECTORY_KEY).await? {
            Some(doc) => serde_json::from_value(doc).context("Invalid org directory document")?,
            None => OrgDirectoryDocument::default(),
        };
        let products: OrgProductDocument = match self.store.get(ORG_PRODUCTS_KEY).await? {
            Some(doc) => serde_json::from_value(doc).context("Invalid org product document")?,
            None => OrgProductDocument::default(),
        };
        Ok(OrgLookup::new(directory, products))
    }

    pub async fn store_org_documents(
        &self,
        directory: Option<&OrgDirectoryDocument>,
        products: Option<&OrgProductDocument>,
    ) -> Result<()> {
        if let Some(directory) = directory {
            self.store
                .put(ORG_DIRECTORY_KEY, &serde_json::to_value(directory)?)
                .await?;
        }
        if let Some(products) = products {
            self.store
                .put(ORG_PRODUCTS_KEY, &serde_json::to_value(products)?)
                .await?;
        }
        Ok(())
    }

    /// All stored resource snapshots. Unusable documents are skipped and
    /// reported.
    pub async fn load_snapshots(&self) -> Result<Vec<ResourceSnapshot>> {
        let mut snapshots = Vec::new();
        for resource_type in ResourceType::ALL {
            let prefix = format!("{}-", resource_type);
            for (key, document) in self.store.scan_prefix(&prefix).await? {
                match parse_snapshot(document) {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(reason) => self.events.emit(EngineEvent::SnapshotSkipped {
                        primary_key: key,
                        reason,
                    }),
                }
            }
        }
        debug!(count = snapshots.len(), "Loaded resource snapshots");
        Ok(snapshots)
    }

    /// Replace every stored snapshot with `documents`.
    ///
    /// Documents are stored under their own primary key; ones without a
    /// recognizable primary key are reported and skipped.
    pub async fn replace_snapshots(&self, documents: Vec<Value>) -> Result<usize> {
        for resource_type in ResourceType::ALL {
            let prefix = format!("{}-", resource_type);
            for (key, _) in self.store.scan_prefix(&prefix).await? {
                self.store.delete(&key).await?;
            }
        }

        let mut stored = 0;
        for document in documents {
            let raw: RawResourceDocument = match serde_json::from_value(document.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    self.events.emit(EngineEvent::SnapshotSkipped {
                        primary_key: String::new(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if let Err(e) = ResourceSnapshot::from_document(raw.clone()) {
                self.events.emit(EngineEvent::SnapshotSkipped {
                    primary_key: raw.primary_key,
                    reason: e.to_string(),
                });
                continue;
            }
            self.store.put(&raw.primary_key, &document).await?;
            stored += 1;
        }

        info!(stored, "Replaced resource snapshots");
        Ok(stored)
    }

    /// Delete all analysis records, then write one per analysis.
    pub async fn replace_analyses(&self, analyses: &[TagAnalysis]) -> Result<Vec<AnalysisRecord>> {
        let stale = self.store.scan_prefix(AnalysisRecord::KEY_PREFIX).await?;
        for (key, _) in &stale {
            self.store.delete(key).await?;
        }
        debug!(removed = stale.len(), "Cleared previous analyses");

        let mut records = Vec::with_capacity(analyses.len());
        for analysis in analyses {
            let record = AnalysisRecord::new(analysis.clone());
            self.store
                .put(&record.id, &serde_json::to_value(&record)?)
                .await?;
            records.push(record);
        }
        Ok(records)
    }

    pub async fn load_analyses(&self) -> Result<Vec<TagAnalysis>> {
        let mut analyses = Vec::new();
        for (key, document) in self.store.scan_prefix(AnalysisRecord::KEY_PREFIX).await? {
            let record: AnalysisRecord = serde_json::from_value(document)
                .with_context(|| format!("Stored analysis {} is unreadable", key))?;
            analyses.push(record.analysis);
        }
        // Record ids are random; keep plans stable across runs
        analyses.sort_by_key(TagAnalysis::key);
        Ok(analyses)
    }
}

fn parse_snapshot(document: Value) -> std::result::Result<ResourceSnapshot, String> {
    let raw: RawResourceDocument = serde_json::from_value(document).map_err(|e| e.to_string())?;
    ResourceSnapshot::from_document(raw).map_err(|e| e.to_string())
}
