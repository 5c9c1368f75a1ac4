// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Association Resolver
//!
//! Batch-wide second pass over the base analyses. Two rules read signals from
//! related resources and may replace a resource's analysis with a superseding
//! one that forces the product tag:
//!
//! - **Volumes** inherit the product of the instance they are attached to
//!   (first attachment only).
//! - **Databases** take the product mapped to the org named in their
//!   org/space tag.
//!
//! Rules only read base analyses, so the outcome does not depend on the order
//! in which resources appear in the batch. Resources no rule touches are
//! returned unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::analysis::TagAnalysis;
use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::manager_config::{AssociationConfig, ConflictPolicy};
use crate::domain::org::{OrgLookup, OrgResolution};
use crate::domain::policy::TagPolicyConfig;
use crate::domain::resource::{ResourceKey, ResourceType};

pub struct AssociationResolver {
    product_tag: String,
    org_space_tag: String,
    conflict_policy: ConflictPolicy,
    events: Arc<dyn EventSink>,
}

impl AssociationResolver {
    pub fn new(settings: &AssociationConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            product_tag: settings.product_tag.clone(),
            org_space_tag: settings.org_space_tag.clone(),
            conflict_policy: settings.conflict_policy,
            events,
        }
    }

    /// Apply both rules and return the superseded batch in input order.
    pub fn resolve(
        &self,
        analyses: Vec<TagAnalysis>,
        org_lookup: &OrgLookup,
        policy: &TagPolicyConfig,
    ) -> Vec<TagAnalysis> {
        let product = policy.resolve_canonical_key(&self.product_tag);
        let org_space = policy.resolve_canonical_key(&self.org_space_tag);

        let instances: HashMap<&str, &TagAnalysis> = analyses
            .iter()
            .filter(|a| a.source_snapshot.resource_type == ResourceType::Ec2)
            .map(|a| (a.source_snapshot.resource_id.as_str(), a))
            .collect();

        let superseded: Vec<Option<TagAnalysis>> = analyses
            .iter()
            .map(|analysis| match analysis.source_snapshot.resource_type {
                ResourceType::Ebs => self.inherit_from_instance(analysis, &instances, &product),
                ResourceType::Rds => {
                    self.inherit_from_org(analysis, org_lookup, policy, &product, &org_space)
                }
                _ => None,
            })
            .collect();

        analyses
            .into_iter()
            .zip(superseded)
            .map(|(base, replacement)| replacement.unwrap_or(base))
            .collect()
    }

    fn inherit_from_instance(
        &self,
        volume: &TagAnalysis,
        instances: &HashMap<&str, &TagAnalysis>,
        product: &str,
    ) -> Option<TagAnalysis> {
        if volume.matched_value(product).is_some() {
            return None;
        }

        let volume_key = volume.key();
        let Some(instance_id) = volume.source_snapshot.attached_instance() else {
            self.events.emit(EngineEvent::VolumeNotAttached { volume: volume_key });
            return None;
        };

        let Some(instance) = instances.get(instance_id) else {
            self.events.emit(EngineEvent::AttachedInstanceNotFound {
                volume: volume_key,
                instance_id: instance_id.to_string(),
            });
            return None;
        };

        match instance.matched_value(product) {
            Some(value) => {
                debug!(volume = %volume_key, instance = instance_id, product = value, "Volume inherits instance product");
                Some(volume.superseded_with(product, value))
            }
            None => {
                self.events.emit(EngineEvent::InstanceWithoutProduct {
                    volume: volume_key,
                    instance: ResourceKey::new(ResourceType::Ec2, instance_id),
                });
                None
            }
        }
    }

    fn inherit_from_org(
        &self,
        database: &TagAnalysis,
        org_lookup: &OrgLookup,
        policy: &TagPolicyConfig,
        product: &str,
        org_space: &str,
    ) -> Option<TagAnalysis> {
        let org_space_value = database.source_snapshot.raw_tags.iter().find_map(|t| {
            let is_org_space = policy.resolve_canonical_key(&t.key) == org_space
                || t.key.eq_ignore_ascii_case(&self.org_space_tag);
            is_org_space.then_some(t.value.as_str())
        })?;

        let database_key = database.key();
        let (org, mapped) = match org_lookup.resolve(org_space_value) {
            OrgResolution::Product { org, product } => (org, product),
            OrgResolution::Unmapped { org } => {
                self.events.emit(EngineEvent::OrgUnmapped {
                    database: database_key,
                    org,
                });
                return None;
            }
            OrgResolution::Empty => return None,
        };

        if let Some(tagged) = database.matched_value(product) {
            if tagged.eq_ignore_ascii_case(&mapped) {
                return None;
            }
            let overwrite = self.conflict_policy == ConflictPolicy::Overwrite;
            self.events.emit(EngineEvent::ProductConflict {
                database: database_key,
                tagged: tagged.to_string(),
                org,
                mapped: mapped.clone(),
                overwritten: overwrite,
            });
            if !overwrite {
                return None;
            }
        }

        Some(database.superseded_with(product, &mapped))
    }
}
