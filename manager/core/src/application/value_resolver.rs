// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Value Resolver
//!
//! Derives the expected value of a managed tag from the other tags already
//! matched on the same resource, following the tag's derivation instruction.
//! Never fails: anything it cannot resolve comes back as `None` together with
//! an [`EngineEvent`] on the injected sink.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Shared by the analyzer (to check a value) and the enforcer
//!   (to correct one)

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::policy::{Derivation, TagPolicyConfig};
use crate::domain::resource::ResourceKey;

#[derive(Clone)]
pub struct ValueResolver {
    events: Arc<dyn EventSink>,
}

impl ValueResolver {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }

    /// Expected value of `canonical` given the resource's matched tags
    /// (keyed by canonical name).
    pub fn derive_value(
        &self,
        canonical: &str,
        matched: &BTreeMap<String, String>,
        resource: &ResourceKey,
        policy: &TagPolicyConfig,
    ) -> Option<String> {
        let tag = policy.get(canonical)?;

        match &tag.derivation {
            Derivation::AlwaysPopulate => Some(tag.canonical.clone()),
            Derivation::CopyValue { reference } => {
                let value = matched.get(reference).cloned();
                if value.is_none() {
                    self.events.emit(EngineEvent::UnresolvedCopyReference {
                        resource: resource.clone(),
                        tag: canonical.to_string(),
                        reference: reference.clone(),
                    });
                }
                value
            }
            Derivation::LookupValue { reference, table } => {
                let reference_value = matched.get(reference);
                let mapped =
                    reference_value.and_then(|value| table.get(&value.to_lowercase()).cloned());
                if mapped.is_none() {
                    self.events.emit(EngineEvent::UnresolvedLookupReference {
                        resource: resource.clone(),
                        tag: canonical.to_string(),
                        reference: reference.clone(),
                        reference_value: reference_value.cloned(),
                    });
                }
                mapped
            }
            Derivation::None => {
                self.events.emit(EngineEvent::NoDerivationInstruction {
                    resource: resource.clone(),
                    tag: canonical.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceType;
    use crate::infrastructure::audit::RecordingEventSink;
    use serde_json::json;

    fn policy() -> TagPolicyConfig {
        TagPolicyConfig::from_document(&json!({
            "product": { "validKeyNames": ["fuse:product"], "values": ["outcomes", "care"] },
            "apmid": {
                "values": { "outcomes": "APM0001", "care": "APM0002" },
                "lookupValue": "fuse:product"
            },
            "team": { "copyValue": "product" },
            "owner": { "alwaysPopulate": true },
            "cost-center": { "values": [] }
        }))
        .unwrap()
    }

    fn key() -> ResourceKey {
        ResourceKey::new(ResourceType::Ec2, "i-1")
    }

    #[test]
    fn test_each_strategy() {
        let sink = Arc::new(RecordingEventSink::new());
        let resolver = ValueResolver::new(sink.clone());
        let policy = policy();
        let matched = BTreeMap::from([("product".to_string(), "Care".to_string())]);

        assert_eq!(
            resolver.derive_value("apmid", &matched, &key(), &policy).as_deref(),
            Some("APM0002")
        );
        assert_eq!(
            resolver.derive_value("team", &matched, &key(), &policy).as_deref(),
            Some("Care")
        );
        assert_eq!(
            resolver.derive_value("owner", &matched, &key(), &policy).as_deref(),
            Some("owner")
        );
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_unresolvable_references_return_none_with_warning() {
        let sink = Arc::new(RecordingEventSink::new());
        let resolver = ValueResolver::new(sink.clone());
        let policy = policy();

        let empty = BTreeMap::new();
        assert_eq!(resolver.derive_value("team", &empty, &key(), &policy), None);
        assert_eq!(resolver.derive_value("apmid", &empty, &key(), &policy), None);

        let unmapped = BTreeMap::from([("product".to_string(), "billing".to_string())]);
        assert_eq!(resolver.derive_value("apmid", &unmapped, &key(), &policy), None);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], EngineEvent::UnresolvedCopyReference { .. }));
        assert!(matches!(
            &events[2],
            EngineEvent::UnresolvedLookupReference { reference_value: Some(v), .. } if v == "billing"
        ));
    }

    #[test]
    fn test_no_instruction_and_unknown_tag() {
        let sink = Arc::new(RecordingEventSink::new());
        let resolver = ValueResolver::new(sink.clone());
        let policy = policy();
        let matched = BTreeMap::new();

        assert_eq!(resolver.derive_value("cost-center", &matched, &key(), &policy), None);
        assert_eq!(resolver.derive_value("not-managed", &matched, &key(), &policy), None);
        assert_eq!(sink.events().len(), 1);
    }
}
