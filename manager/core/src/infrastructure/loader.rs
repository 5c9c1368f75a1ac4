// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! File loaders for operator-supplied documents.
//!
//! Policies, org documents and resource exports may be JSON or YAML; the file
//! extension decides (`.yaml`/`.yml` is YAML, everything else JSON).

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::org::{OrgDirectoryDocument, OrgProductDocument};
use crate::domain::policy::TagPolicyConfig;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    )
}

pub fn read_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// Raw policy document plus its validated form.
pub fn read_policy_file(path: impl AsRef<Path>) -> Result<(Value, TagPolicyConfig)> {
    let path = path.as_ref();
    let document: Value = read_document(path)?;
    let policy = TagPolicyConfig::from_document(&document)
        .with_context(|| format!("Policy in {} is invalid", path.display()))?;
    Ok((document, policy))
}

pub fn read_org_directory(path: impl AsRef<Path>) -> Result<OrgDirectoryDocument> {
    read_document(path)
}

pub fn read_org_products(path: impl AsRef<Path>) -> Result<OrgProductDocument> {
    read_document(path)
}

/// Resource documents from an export file.
///
/// Accepts either an array of documents or an object keyed by primary key
/// (a store dump); in the latter case the key fills in a missing
/// `primaryKey`.
pub fn read_resource_file(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let document: Value = read_document(path)?;
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(key, mut doc)| {
                if let Value::Object(fields) = &mut doc {
                    if !fields.contains_key("primaryKey") && !fields.contains_key("_pk") {
                        fields.insert("primaryKey".to_string(), Value::String(key));
                    }
                }
                doc
            })
            .collect()),
        _ => anyhow::bail!(
            "{} must contain an array or an object of resource documents",
            path.display()
        ),
    }
}
