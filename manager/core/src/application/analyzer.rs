// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Tag Analyzer
//!
//! Partitions a resource's raw tags into matched, invalid and extra, and lists
//! the required tags the resource does not carry.
//!
//! Classification runs in two steps. Tags without a copy/lookup instruction
//! are checked first (enumerated values, or non-empty for `alwaysPopulate`).
//! Tags with a copy/lookup instruction are then checked against a value
//! derived from that first matched set, so the result never depends on the
//! order in which raw tags arrive.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::value_resolver::ValueResolver;
use crate::domain::analysis::{TagAnalysis, TagStatus};
use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::policy::{Derivation, TagPolicy, TagPolicyConfig};
use crate::domain::resource::ResourceSnapshot;

pub struct TagAnalyzer {
    resolver: ValueResolver,
    events: Arc<dyn EventSink>,
}

impl TagAnalyzer {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: ValueResolver::new(events.clone()),
            events,
        }
    }

    /// Classify every snapshot, reporting progress per resource.
    pub fn classify_all(
        &self,
        snapshots: &[ResourceSnapshot],
        policy: &TagPolicyConfig,
    ) -> Vec<TagAnalysis> {
        let total = snapshots.len();
        snapshots
            .iter()
            .enumerate()
            .map(|(index, snapshot)| {
                let analysis = self.classify(snapshot, policy);
                self.events.emit(EngineEvent::ResourceClassified {
                    resource: snapshot.key(),
                    position: index + 1,
                    total,
                });
                analysis
            })
            .collect()
    }

    pub fn classify(&self, snapshot: &ResourceSnapshot, policy: &TagPolicyConfig) -> TagAnalysis {
        let mut analysis = TagAnalysis::empty(snapshot.clone());
        let resource = snapshot.key();

        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        let mut derived: Vec<(&TagPolicy, &str)> = Vec::new();

        for tag in &snapshot.raw_tags {
            let Some(canonical) = policy.lookup_canonical(&tag.key) else {
                analysis.extra_tags.insert(tag.key.clone(), tag.value.clone());
                continue;
            };

            if seen.insert(canonical, tag.key.as_str()).is_some() {
                self.events.emit(EngineEvent::DuplicateAlias {
                    resource: resource.clone(),
                    canonical: canonical.to_string(),
                    raw_key: tag.key.clone(),
                });
                continue;
            }

            let Some(entry) = policy.get(canonical) else {
                continue;
            };

            match &entry.derivation {
                Derivation::CopyValue { .. } | Derivation::LookupValue { .. } => {
                    derived.push((entry, tag.value.as_str()));
                }
                Derivation::AlwaysPopulate => {
                    let status = if tag.value.trim().is_empty() {
                        TagStatus::Invalid
                    } else {
                        TagStatus::Valid
                    };
                    record(&mut analysis, canonical, &tag.value, status);
                }
                Derivation::None => {
                    let status = if entry.accepts_value(&tag.value) {
                        TagStatus::Valid
                    } else {
                        TagStatus::Invalid
                    };
                    record(&mut analysis, canonical, &tag.value, status);
                }
            }
        }

        let base = analysis.matched_tags.clone();
        for (entry, value) in derived {
            let expected = self
                .resolver
                .derive_value(&entry.canonical, &base, &resource, policy);
            let status = match expected {
                Some(expected) if expected.to_lowercase() == value.to_lowercase() => {
                    TagStatus::Valid
                }
                _ => TagStatus::Invalid,
            };
            record(&mut analysis, &entry.canonical, value, status);
        }

        for required in policy.required_tags() {
            let present = snapshot
                .raw_tags
                .iter()
                .any(|t| policy.is_spelling_of(&t.key, &required.canonical));
            if !present {
                analysis.unmatched_tags.push(required.canonical.clone());
            }
        }

        debug!(
            resource = %resource,
            matched = analysis.matched_tags.len(),
            invalid = analysis.invalid_tags.len(),
            missing = analysis.unmatched_tags.len(),
            extra = analysis.extra_tags.len(),
            "Classified resource"
        );

        analysis
    }
}

fn record(analysis: &mut TagAnalysis, canonical: &str, value: &str, status: TagStatus) {
    let target = match status {
        TagStatus::Valid => &mut analysis.matched_tags,
        TagStatus::Invalid => &mut analysis.invalid_tags,
        TagStatus::Extra => &mut analysis.extra_tags,
    };
    target.insert(canonical.to_string(), value.to_string());
}
