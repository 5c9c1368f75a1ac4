// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Tag Policy
//!
//! The declarative tagging policy: one entry per canonical tag name, each
//! listing the alias spellings that count as that tag, the accepted values,
//! whether the tag is required, and at most one derivation instruction.
//!
//! The policy document is loosely typed JSON/YAML. [`TagPolicyConfig`] is the
//! validated, immutable form built once at load time; every invariant the
//! engine relies on (unambiguous aliases, one derivation per tag, resolvable
//! references) is checked here so nothing is discovered mid-batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Bookkeeping key the document store adds to every record.
const DOCUMENT_KEY_FIELD: &str = "_pk";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy document is empty")]
    Empty,

    #[error("Policy document must be an object keyed by canonical tag name")]
    NotAnObject,

    #[error("Invalid policy entry for '{tag}': {reason}")]
    InvalidEntry { tag: String, reason: String },

    #[error("Alias '{alias}' is declared by both '{first}' and '{second}'")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Tag '{0}' declares more than one derivation instruction")]
    ConflictingDerivation(String),

    #[error("Tag '{tag}' refers to unknown tag '{reference}'")]
    UnknownReference { tag: String, reference: String },

    #[error("Tag '{0}' derives its value from itself")]
    SelfReference(String),

    #[error("Tag '{tag}' derives from '{reference}', which is itself derived")]
    ChainedReference { tag: String, reference: String },

    #[error("Tag '{0}' uses lookupValue but its values are not a map")]
    LookupWithoutTable(String),
}

/// Accepted values as written in the document: a plain list or a lookup map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyValues {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Default for PolicyValues {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// One entry of the policy document, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPolicyDocument {
    #[serde(default)]
    pub valid_key_names: Vec<String>,
    #[serde(default)]
    pub values: PolicyValues,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub always_populate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_value: Option<String>,
}

/// How a tag's correct value is computed, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    None,
    /// Any non-empty value; the canonical name is the placeholder.
    AlwaysPopulate,
    /// Copy the value of another (matched) tag on the same resource.
    CopyValue { reference: String },
    /// Map the value of another (matched) tag through `table`.
    /// Table keys are lower-cased.
    LookupValue {
        reference: String,
        table: BTreeMap<String, String>,
    },
}

impl Derivation {
    pub fn is_none(&self) -> bool {
        matches!(self, Derivation::None)
    }
}

/// Validated policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    pub canonical: String,
    /// Lower-cased alias spellings; always includes the canonical name.
    pub aliases: Vec<String>,
    /// Lower-cased enumerated values; empty means any value.
    pub allowed_values: Vec<String>,
    pub required: bool,
    pub derivation: Derivation,
}

impl TagPolicy {
    pub fn accepts_value(&self, value: &str) -> bool {
        if self.allowed_values.is_empty() {
            return true;
        }
        let lowered = value.to_lowercase();
        self.allowed_values.iter().any(|v| *v == lowered)
    }

    fn has_alias_ignore_case(&self, raw_key: &str) -> bool {
        let lowered = raw_key.to_lowercase();
        self.canonical.to_lowercase() == lowered || self.aliases.iter().any(|a| *a == lowered)
    }
}

/// Immutable, validated tagging policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicyConfig {
    tags: BTreeMap<String, TagPolicy>,
    aliases: BTreeMap<String, String>,
}

impl TagPolicyConfig {
    /// Validate a raw JSON policy document.
    pub fn from_document(doc: &Value) -> Result<Self, PolicyError> {
        let entries = doc.as_object().ok_or(PolicyError::NotAnObject)?;

        let mut raw = BTreeMap::new();
        for (name, entry) in entries {
            if name == DOCUMENT_KEY_FIELD {
                continue;
            }
            let parsed: TagPolicyDocument =
                serde_json::from_value(entry.clone()).map_err(|e| PolicyError::InvalidEntry {
                    tag: name.clone(),
                    reason: e.to_string(),
                })?;
            raw.insert(name.clone(), parsed);
        }

        Self::from_entries(raw)
    }

    /// Validate already-typed entries.
    pub fn from_entries(entries: BTreeMap<String, TagPolicyDocument>) -> Result<Self, PolicyError> {
        if entries.is_empty() {
            return Err(PolicyError::Empty);
        }

        let mut aliases: BTreeMap<String, String> = BTreeMap::new();
        for (canonical, entry) in &entries {
            if canonical.trim().is_empty() {
                return Err(PolicyError::InvalidEntry {
                    tag: canonical.clone(),
                    reason: "canonical name cannot be empty".to_string(),
                });
            }
            for alias in entry.valid_key_names.iter().map(|a| a.to_lowercase()) {
                if alias == *canonical {
                    continue;
                }
                if let Some(owner) = entries.keys().find(|c| **c == alias) {
                    return Err(PolicyError::AmbiguousAlias {
                        alias,
                        first: owner.clone(),
                        second: canonical.clone(),
                    });
                }
                match aliases.get(&alias) {
                    Some(first) if first != canonical => {
                        return Err(PolicyError::AmbiguousAlias {
                            alias,
                            first: first.clone(),
                            second: canonical.clone(),
                        });
                    }
                    _ => {
                        aliases.insert(alias, canonical.clone());
                    }
                }
            }
        }

        let resolve = |reference: &str| -> Option<String> {
            if entries.contains_key(reference) {
                return Some(reference.to_string());
            }
            aliases.get(&reference.to_lowercase()).cloned()
        };

        let mut tags = BTreeMap::new();
        for (canonical, entry) in &entries {
            let derivation = Self::build_derivation(canonical, entry, &entries, &resolve)?;

            let allowed_values = match &entry.values {
                PolicyValues::List(values) => values.iter().map(|v| v.to_lowercase()).collect(),
                PolicyValues::Map(map) => map.keys().map(|v| v.to_lowercase()).collect(),
            };

            let mut tag_aliases: Vec<String> = vec![canonical.to_lowercase()];
            for alias in entry.valid_key_names.iter().map(|a| a.to_lowercase()) {
                if !tag_aliases.contains(&alias) {
                    tag_aliases.push(alias);
                }
            }

            tags.insert(
                canonical.clone(),
                TagPolicy {
                    canonical: canonical.clone(),
                    aliases: tag_aliases,
                    allowed_values,
                    required: entry.required,
                    derivation,
                },
            );
        }

        Ok(Self { tags, aliases })
    }

    fn build_derivation(
        canonical: &str,
        entry: &TagPolicyDocument,
        entries: &BTreeMap<String, TagPolicyDocument>,
        resolve: &impl Fn(&str) -> Option<String>,
    ) -> Result<Derivation, PolicyError> {
        let declared = [
            entry.always_populate,
            entry.copy_value.is_some(),
            entry.lookup_value.is_some(),
        ]
        .iter()
        .filter(|d| **d)
        .count();
        if declared > 1 {
            return Err(PolicyError::ConflictingDerivation(canonical.to_string()));
        }

        let checked_reference = |reference: &str| -> Result<String, PolicyError> {
            let target = resolve(reference).ok_or_else(|| PolicyError::UnknownReference {
                tag: canonical.to_string(),
                reference: reference.to_string(),
            })?;
            if target == canonical {
                return Err(PolicyError::SelfReference(canonical.to_string()));
            }
            // References are checked against non-derived tags only
            if entries
                .get(&target)
                .is_some_and(|t| t.copy_value.is_some() || t.lookup_value.is_some())
            {
                return Err(PolicyError::ChainedReference {
                    tag: canonical.to_string(),
                    reference: target,
                });
            }
            Ok(target)
        };

        if entry.always_populate {
            return Ok(Derivation::AlwaysPopulate);
        }
        if let Some(reference) = &entry.copy_value {
            return Ok(Derivation::CopyValue {
                reference: checked_reference(reference)?,
            });
        }
        if let Some(reference) = &entry.lookup_value {
            let reference = checked_reference(reference)?;
            let PolicyValues::Map(map) = &entry.values else {
                return Err(PolicyError::LookupWithoutTable(canonical.to_string()));
            };
            let table = map
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect();
            return Ok(Derivation::LookupValue { reference, table });
        }
        Ok(Derivation::None)
    }

    /// Canonical name for `raw_key`, or `raw_key` itself when unmanaged.
    ///
    /// Canonical names match as-is; aliases match case-sensitively against
    /// their lower-cased spelling.
    pub fn resolve_canonical_key(&self, raw_key: &str) -> String {
        self.lookup_canonical(raw_key)
            .map(str::to_string)
            .unwrap_or_else(|| raw_key.to_string())
    }

    /// Canonical name for `raw_key` if the policy manages it.
    pub fn lookup_canonical(&self, raw_key: &str) -> Option<&str> {
        if let Some((name, _)) = self.tags.get_key_value(raw_key) {
            return Some(name.as_str());
        }
        self.aliases.get(raw_key).map(String::as_str)
    }

    pub fn get(&self, canonical: &str) -> Option<&TagPolicy> {
        self.tags.get(canonical)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.tags.contains_key(canonical)
    }

    pub fn tags(&self) -> impl Iterator<Item = &TagPolicy> {
        self.tags.values()
    }

    pub fn required_tags(&self) -> impl Iterator<Item = &TagPolicy> {
        self.tags.values().filter(|t| t.required)
    }

    /// Whether `raw_key` is any spelling of `canonical`, ignoring case.
    pub fn is_spelling_of(&self, raw_key: &str, canonical: &str) -> bool {
        self.tags
            .get(canonical)
            .is_some_and(|t| t.has_alias_ignore_case(raw_key))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TagPolicyConfig {
        TagPolicyConfig::from_document(&json!({
            "_pk": "CONFIG-1000",
            "product": {
                "validKeyNames": ["product", "fuse:product"],
                "values": ["outcomes", "care"],
                "required": true
            },
            "apmid": {
                "validKeyNames": ["apm-id", "APMID"],
                "values": { "Outcomes": "APM0001", "care": "APM0002" },
                "required": true,
                "lookupValue": "fuse:product"
            },
            "owner": {
                "validKeyNames": [],
                "values": [],
                "required": false,
                "alwaysPopulate": true
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_alias_equivalence() {
        let policy = sample();
        for tag in policy.tags() {
            for alias in &tag.aliases {
                assert_eq!(policy.resolve_canonical_key(alias), tag.canonical);
            }
            assert_eq!(policy.resolve_canonical_key(&tag.canonical), tag.canonical);
        }
    }

    #[test]
    fn test_unmanaged_keys_resolve_to_themselves() {
        let policy = sample();
        assert_eq!(policy.resolve_canonical_key("Name"), "Name");
        assert_eq!(policy.lookup_canonical("Name"), None);
    }

    #[test]
    fn test_alias_resolution_is_case_sensitive() {
        let policy = sample();
        assert_eq!(policy.resolve_canonical_key("apmid"), "apmid");
        assert_eq!(policy.resolve_canonical_key("APMID"), "APMID");
        assert_eq!(policy.resolve_canonical_key("apm-id"), "apmid");
        assert!(policy.is_spelling_of("APMID", "apmid"));
    }

    #[test]
    fn test_lookup_reference_is_normalized_and_table_lowercased() {
        let policy = sample();
        let apmid = policy.get("apmid").unwrap();
        match &apmid.derivation {
            Derivation::LookupValue { reference, table } => {
                assert_eq!(reference, "product");
                assert_eq!(table.get("outcomes").map(String::as_str), Some("APM0001"));
            }
            other => panic!("unexpected derivation {other:?}"),
        }
    }

    #[test]
    fn test_rejects_ambiguous_alias() {
        let err = TagPolicyConfig::from_document(&json!({
            "product": { "validKeyNames": ["team"] },
            "owner": { "validKeyNames": ["Team"] }
        }))
        .unwrap_err();
        assert!(matches!(err, PolicyError::AmbiguousAlias { .. }));
    }

    #[test]
    fn test_rejects_alias_shadowing_canonical_name() {
        let err = TagPolicyConfig::from_document(&json!({
            "product": { "validKeyNames": ["owner"] },
            "owner": {}
        }))
        .unwrap_err();
        assert!(matches!(err, PolicyError::AmbiguousAlias { .. }));
    }

    #[test]
    fn test_rejects_multiple_derivations() {
        let err = TagPolicyConfig::from_document(&json!({
            "product": {},
            "team": { "alwaysPopulate": true, "copyValue": "product" }
        }))
        .unwrap_err();
        assert_eq!(err, PolicyError::ConflictingDerivation("team".to_string()));
    }

    #[test]
    fn test_rejects_bad_references() {
        let unknown = TagPolicyConfig::from_document(&json!({
            "team": { "copyValue": "product" }
        }))
        .unwrap_err();
        assert!(matches!(unknown, PolicyError::UnknownReference { .. }));

        let itself = TagPolicyConfig::from_document(&json!({
            "team": { "copyValue": "team" }
        }))
        .unwrap_err();
        assert_eq!(itself, PolicyError::SelfReference("team".to_string()));

        let no_table = TagPolicyConfig::from_document(&json!({
            "product": {},
            "apmid": { "values": ["a"], "lookupValue": "product" }
        }))
        .unwrap_err();
        assert_eq!(no_table, PolicyError::LookupWithoutTable("apmid".to_string()));
    }

    #[test]
    fn test_rejects_reference_to_derived_tag() {
        let err = TagPolicyConfig::from_document(&json!({
            "product": { "values": ["care"] },
            "team": { "copyValue": "product" },
            "squad": { "validKeyNames": ["fuse:squad"], "copyValue": "team" }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            PolicyError::ChainedReference {
                tag: "squad".to_string(),
                reference: "team".to_string(),
            }
        );

        let from_placeholder = TagPolicyConfig::from_document(&json!({
            "owner": { "alwaysPopulate": true },
            "team": { "copyValue": "owner" }
        }));
        assert!(from_placeholder.is_ok());
    }

    #[test]
    fn test_rejects_empty_document() {
        assert_eq!(
            TagPolicyConfig::from_document(&json!({ "_pk": "CONFIG-1000" })).unwrap_err(),
            PolicyError::Empty
        );
        assert_eq!(
            TagPolicyConfig::from_document(&json!([])).unwrap_err(),
            PolicyError::NotAnObject
        );
    }

    #[test]
    fn test_enumerated_values_match_ignoring_case() {
        let policy = sample();
        let product = policy.get("product").unwrap();
        assert!(product.accepts_value("Outcomes"));
        assert!(!product.accepts_value("billing"));
        assert!(policy.get("owner").unwrap().accepts_value("anything"));
    }
}
