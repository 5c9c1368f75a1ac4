// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Enforcement Planner
//!
//! Turns analyses into complete replacement tag sets. The write set always
//! carries every tag the resource keeps, so the same action is correct for
//! additive and full-replace tagging APIs alike.
//!
//! Per resource:
//! 1. skip if the resource already carries a sentinel tag;
//! 2. keep extra and matched tags;
//! 3. derive values for invalid and missing tags, keeping unresolved invalid
//!    values and listing unresolved keys under the sentinel markers;
//! 4. apply forced values from the association pass;
//! 5. skip if the write set would lose an original key, or changes nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::value_resolver::ValueResolver;
use crate::domain::analysis::TagAnalysis;
use crate::domain::enforcement::{EnforcementAction, SentinelConvention};
use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::policy::TagPolicyConfig;

pub struct EnforcementPlanner {
    resolver: ValueResolver,
    sentinel: SentinelConvention,
    events: Arc<dyn EventSink>,
}

impl EnforcementPlanner {
    pub fn new(sentinel: SentinelConvention, events: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: ValueResolver::new(events.clone()),
            sentinel,
            events,
        }
    }

    pub fn compute_actions(
        &self,
        analyses: &[TagAnalysis],
        policy: &TagPolicyConfig,
    ) -> Vec<EnforcementAction> {
        analyses
            .iter()
            .filter_map(|analysis| self.compute_action(analysis, policy))
            .collect()
    }

    pub fn compute_action(
        &self,
        analysis: &TagAnalysis,
        policy: &TagPolicyConfig,
    ) -> Option<EnforcementAction> {
        let snapshot = &analysis.source_snapshot;
        let resource = snapshot.key();

        if snapshot.raw_tags.iter().any(|t| self.sentinel.is_sentinel(&t.key)) {
            self.events.emit(EngineEvent::SentinelPresent { resource });
            return None;
        }

        // Canonical name -> key physically present on the resource
        let mut physical: BTreeMap<&str, &str> = BTreeMap::new();
        for tag in &snapshot.raw_tags {
            if let Some(canonical) = policy.lookup_canonical(&tag.key) {
                physical.entry(canonical).or_insert(tag.key.as_str());
            }
        }
        let write_key = |canonical: &str| -> String {
            physical
                .get(canonical)
                .map(|k| k.to_string())
                .unwrap_or_else(|| canonical.to_string())
        };

        let forced: BTreeMap<String, String> = analysis
            .force_add_tags
            .iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();

        let mut context = analysis.matched_tags.clone();
        context.extend(forced.clone());

        let mut tags: BTreeMap<String, String> = analysis.extra_tags.clone();
        for (canonical, value) in &analysis.matched_tags {
            tags.insert(write_key(canonical), value.clone());
        }

        let mut unresolved_invalid = Vec::new();
        for (canonical, current) in &analysis.invalid_tags {
            if forced.contains_key(canonical) {
                continue;
            }
            match self.resolver.derive_value(canonical, &context, &resource, policy) {
                Some(value) => {
                    tags.insert(write_key(canonical), value);
                }
                None => {
                    tags.insert(write_key(canonical), current.clone());
                    unresolved_invalid.push(canonical.clone());
                }
            }
        }

        let mut unresolved_missing = Vec::new();
        for canonical in &analysis.unmatched_tags {
            if forced.contains_key(canonical) {
                continue;
            }
            match self.resolver.derive_value(canonical, &context, &resource, policy) {
                Some(value) => {
                    tags.insert(canonical.clone(), value);
                }
                None => unresolved_missing.push(canonical.clone()),
            }
        }

        if !unresolved_invalid.is_empty() {
            tags.insert(
                self.sentinel.invalid_keys_tag(),
                SentinelConvention::join(&unresolved_invalid),
            );
        }
        if !unresolved_missing.is_empty() {
            tags.insert(
                self.sentinel.missing_keys_tag(),
                SentinelConvention::join(&unresolved_missing),
            );
        }

        for (canonical, value) in &forced {
            tags.insert(write_key(canonical), value.clone());
        }

        let mut dropped: Vec<String> = snapshot
            .raw_tags
            .iter()
            .filter(|t| !tags.contains_key(&t.key))
            .map(|t| t.key.clone())
            .collect();
        if !dropped.is_empty() {
            dropped.dedup();
            self.events.emit(EngineEvent::DataLossGuard {
                resource,
                dropped_keys: dropped,
            });
            return None;
        }

        if tags.len() == snapshot.raw_tags.len() && tags == snapshot.tag_map() {
            debug!(resource = %resource, "No tag changes required");
            return None;
        }

        Some(EnforcementAction {
            resource_id: snapshot.resource_id.clone(),
            resource_type: snapshot.resource_type,
            write_target: snapshot.write_target().to_string(),
            tags_to_write: tags,
        })
    }
}
