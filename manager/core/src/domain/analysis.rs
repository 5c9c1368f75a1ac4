// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Tag Analysis
//!
//! Per-resource classification of raw tags against the policy.
//!
//! | Field | Contents |
//! |-------|----------|
//! | `matched_tags` | managed tags with a valid value, keyed by canonical name |
//! | `invalid_tags` | managed tags with an invalid value, keyed by canonical name |
//! | `unmatched_tags` | required canonical names absent from the resource |
//! | `extra_tags` | unmanaged tags, keyed by their raw key |
//! | `force_add_tags` | values imposed by cross-resource association |
//!
//! Maps are ordered so that repeated analyses serialize identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::resource::{ResourceKey, ResourceSnapshot};

/// Validity of a single raw tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Valid,
    Invalid,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAnalysis {
    #[serde(default)]
    pub matched_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub invalid_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub unmatched_tags: Vec<String>,
    #[serde(default)]
    pub extra_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub force_add_tags: Vec<BTreeMap<String, String>>,
    pub source_snapshot: ResourceSnapshot,
}

impl TagAnalysis {
    pub fn empty(source_snapshot: ResourceSnapshot) -> Self {
        Self {
            matched_tags: BTreeMap::new(),
            invalid_tags: BTreeMap::new(),
            unmatched_tags: Vec::new(),
            extra_tags: BTreeMap::new(),
            force_add_tags: Vec::new(),
            source_snapshot,
        }
    }

    pub fn key(&self) -> ResourceKey {
        self.source_snapshot.key()
    }

    pub fn matched_value(&self, canonical: &str) -> Option<&str> {
        self.matched_tags.get(canonical).map(String::as_str)
    }

    /// Whether `canonical` is invalid or missing on the resource.
    pub fn needs(&self, canonical: &str) -> bool {
        self.invalid_tags.contains_key(canonical)
            || self.unmatched_tags.iter().any(|t| t == canonical)
    }

    /// Superseding analysis that forces `canonical = value`.
    ///
    /// The tag is dropped from the invalid and missing sets; everything else is
    /// carried over unchanged.
    pub fn superseded_with(&self, canonical: &str, value: &str) -> TagAnalysis {
        let mut next = self.clone();
        next.invalid_tags.remove(canonical);
        next.unmatched_tags.retain(|t| t != canonical);
        next.force_add_tags = vec![BTreeMap::from([(canonical.to_string(), value.to_string())])];
        next
    }
}

/// Stored form of an analysis, one record per resource per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub analysis: TagAnalysis,
}

impl AnalysisRecord {
    pub const KEY_PREFIX: &'static str = "ANALYSIS-";

    pub fn new(analysis: TagAnalysis) -> Self {
        Self {
            id: format!("{}{}", Self::KEY_PREFIX, Uuid::new_v4()),
            created_at: Utc::now(),
            analysis,
        }
    }
}
