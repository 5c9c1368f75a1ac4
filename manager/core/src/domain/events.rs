// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Engine Events
//!
//! Every non-fatal condition the engine runs into is reported as an
//! [`EngineEvent`] through an injected [`EventSink`]. Components never log
//! through a global; tests substitute a recording sink and assert on the
//! events directly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::resource::ResourceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ResourceClassified {
        resource: ResourceKey,
        position: usize,
        total: usize,
    },
    SnapshotSkipped {
        primary_key: String,
        reason: String,
    },
    DuplicateAlias {
        resource: ResourceKey,
        canonical: String,
        raw_key: String,
    },
    UnresolvedCopyReference {
        resource: ResourceKey,
        tag: String,
        reference: String,
    },
    UnresolvedLookupReference {
        resource: ResourceKey,
        tag: String,
        reference: String,
        reference_value: Option<String>,
    },
    NoDerivationInstruction {
        resource: ResourceKey,
        tag: String,
    },
    VolumeNotAttached {
        volume: ResourceKey,
    },
    AttachedInstanceNotFound {
        volume: ResourceKey,
        instance_id: String,
    },
    InstanceWithoutProduct {
        volume: ResourceKey,
        instance: ResourceKey,
    },
    OrgUnmapped {
        database: ResourceKey,
        org: String,
    },
    ProductConflict {
        database: ResourceKey,
        tagged: String,
        org: String,
        mapped: String,
        overwritten: bool,
    },
    SentinelPresent {
        resource: ResourceKey,
    },
    DataLossGuard {
        resource: ResourceKey,
        dropped_keys: Vec<String>,
    },
    WriteSucceeded {
        resource: ResourceKey,
        tag_count: usize,
    },
    WriteRetried {
        resource: ResourceKey,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    WriteFailed {
        resource: ResourceKey,
        error: String,
    },
    DispatchCancelled {
        remaining: usize,
    },
}

impl EngineEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            Self::ResourceClassified { .. } => EventLevel::Debug,
            Self::NoDerivationInstruction { .. }
            | Self::VolumeNotAttached { .. }
            | Self::SentinelPresent { .. }
            | Self::WriteSucceeded { .. } => EventLevel::Info,
            Self::WriteFailed { .. } => EventLevel::Error,
            _ => EventLevel::Warn,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceClassified { resource, position, total } => {
                write!(f, "processed {resource} [{position} of {total}]")
            }
            Self::SnapshotSkipped { primary_key, reason } => {
                write!(f, "skipping resource document '{primary_key}': {reason}")
            }
            Self::DuplicateAlias { resource, canonical, raw_key } => write!(
                f,
                "{resource} carries '{raw_key}' as a second spelling of '{canonical}'; keeping the first"
            ),
            Self::UnresolvedCopyReference { resource, tag, reference } => write!(
                f,
                "invalid copyValue reference of '{reference}' for key '{tag}' on {resource}"
            ),
            Self::UnresolvedLookupReference { resource, tag, reference, reference_value } => {
                match reference_value {
                    Some(value) => write!(
                        f,
                        "lookupValue for '{tag}' on {resource}: '{value}' of '{reference}' has no mapping"
                    ),
                    None => write!(
                        f,
                        "could not find a valid lookupValue reference of '{reference}' for '{tag}' on {resource}"
                    ),
                }
            }
            Self::NoDerivationInstruction { resource, tag } => {
                write!(f, "tag '{tag}' for {resource} has no population instruction")
            }
            Self::VolumeNotAttached { volume } => {
                write!(f, "{volume} isn't attached to any instance")
            }
            Self::AttachedInstanceNotFound { volume, instance_id } => write!(
                f,
                "trying to match {volume} to an instance, but couldn't find {instance_id}"
            ),
            Self::InstanceWithoutProduct { volume, instance } => write!(
                f,
                "{volume} is attached to {instance} which doesn't have a valid product tag; volume will not be tagged"
            ),
            Self::OrgUnmapped { database, org } => {
                write!(f, "could not find a product match for org '{org}' ({database})")
            }
            Self::ProductConflict { database, tagged, org, mapped, overwritten } => {
                write!(
                    f,
                    "{database} is tagged to product '{tagged}' but belongs to org '{org}' mapped to '{mapped}'"
                )?;
                if *overwritten {
                    write!(f, "; overwriting product tag with '{mapped}'")
                } else {
                    write!(f, "; leaving existing product tag")
                }
            }
            Self::SentinelPresent { resource } => {
                write!(f, "{resource} carries manager sentinel tags; skipping until cleared")
            }
            Self::DataLossGuard { resource, dropped_keys } => write!(
                f,
                "write set for {resource} would drop {dropped_keys:?}; no tagging changes applied"
            ),
            Self::WriteSucceeded { resource, tag_count } => {
                write!(f, "successfully tagged {resource} with {tag_count} tags")
            }
            Self::WriteRetried { resource, attempt, delay_ms, error } => write!(
                f,
                "retrying {resource} (attempt {attempt}) in {delay_ms}ms after: {error}"
            ),
            Self::WriteFailed { resource, error } => {
                write!(f, "error processing {resource}: {error}")
            }
            Self::DispatchCancelled { remaining } => {
                write!(f, "enforcement cancelled with {remaining} writes not attempted")
            }
        }
    }
}

/// Injected diagnostics capability.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}
