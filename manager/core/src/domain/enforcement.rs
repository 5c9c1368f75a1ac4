// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Enforcement Domain Types
//!
//! An [`EnforcementAction`] is the complete tag set to write back to one
//! resource. The engine only computes it; the [`TagWriter`] port is where an
//! adapter performs the actual cloud call.
//!
//! ## Sentinel tags
//!
//! Tags written by the manager itself carry a reserved key prefix. They record
//! which managed keys could not be resolved, and their presence makes later
//! runs skip the resource until a human clears them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::resource::{ResourceKey, ResourceType};

pub const DEFAULT_SENTINEL_PREFIX: &str = "ftm:";
const SENTINEL_SEPARATOR: &str = "__";

/// How a target API applies a tag write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteSemantics {
    /// Merges into the existing tags, addressed by resource id (create-tags).
    Additive,
    /// Replaces the whole tag set (put-bucket-tagging).
    FullReplace,
    /// Merges into the existing tags, addressed by ARN (add-tags-to-resource).
    AdditiveByArn,
}

impl WriteSemantics {
    pub fn for_resource(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Ec2 | ResourceType::Ebs => Self::Additive,
            ResourceType::S3 => Self::FullReplace,
            ResourceType::Rds => Self::AdditiveByArn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementAction {
    pub resource_id: String,
    pub resource_type: ResourceType,
    /// Identifier the write API addresses (ARN for databases).
    pub write_target: String,
    /// Complete replacement set.
    pub tags_to_write: BTreeMap<String, String>,
}

impl EnforcementAction {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, self.resource_id.clone())
    }

    pub fn semantics(&self) -> WriteSemantics {
        WriteSemantics::for_resource(self.resource_type)
    }
}

/// Reserved key convention for manager-written audit tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelConvention {
    prefix: String,
}

impl Default for SentinelConvention {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL_PREFIX)
    }
}

impl SentinelConvention {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_sentinel(&self, key: &str) -> bool {
        key.len() >= self.prefix.len()
            && key.is_char_boundary(self.prefix.len())
            && key[..self.prefix.len()].eq_ignore_ascii_case(&self.prefix)
    }

    /// Marker for managed keys whose invalid value could not be corrected.
    pub fn invalid_keys_tag(&self) -> String {
        format!("{}invalid-keys", self.prefix)
    }

    /// Marker for required keys that are missing and could not be derived.
    pub fn missing_keys_tag(&self) -> String {
        format!("{}missing-keys", self.prefix)
    }

    pub fn join(keys: &[String]) -> String {
        keys.join(SENTINEL_SEPARATOR)
    }

    pub fn split(value: &str) -> Vec<String> {
        value
            .split(SENTINEL_SEPARATOR)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagWriteError {
    /// Rate limited by the target API; worth retrying.
    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("Rejected by target API: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl TagWriteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_))
    }
}

/// Port to the cloud tagging APIs.
#[async_trait]
pub trait TagWriter: Send + Sync {
    async fn write_tags(&self, action: &EnforcementAction) -> Result<(), TagWriteError>;
}
