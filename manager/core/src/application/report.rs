// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Missing-product report: resources whose product tag is absent or invalid.

use serde::{Deserialize, Serialize};

use crate::domain::analysis::TagAnalysis;
use crate::domain::resource::{ResourceType, Tag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingProductEntry {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub tags: Vec<Tag>,
}

/// Entries for every analysis still lacking a valid product after association.
///
/// Resources with a forced product are not listed; enforcement will fix them.
pub fn missing_product_report(analyses: &[TagAnalysis], product_tag: &str) -> Vec<MissingProductEntry> {
    analyses
        .iter()
        .filter(|a| a.needs(product_tag))
        .filter(|a| !a.force_add_tags.iter().any(|m| m.contains_key(product_tag)))
        .map(|a| MissingProductEntry {
            resource_type: a.source_snapshot.resource_type,
            resource_id: a.source_snapshot.resource_id.clone(),
            tags: a.source_snapshot.raw_tags.clone(),
        })
        .collect()
}

pub fn to_json(entries: &[MissingProductEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}

/// One line per resource: `TYPE,id,key:value,...`
pub fn to_csv(entries: &[MissingProductEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let mut fields = vec![
            csv_field(entry.resource_type.as_str()),
            csv_field(&entry.resource_id),
        ];
        fields.extend(
            entry
                .tags
                .iter()
                .map(|t| csv_field(&format!("{}:{}", t.key, t.value))),
        );
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
