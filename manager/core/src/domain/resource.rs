// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Snapshots
//!
//! Read-only views of cloud resources as supplied by the import collaborator.
//! A snapshot is identified by `(ResourceType, resource_id)` and never changes
//! once imported.
//!
//! ## Input document shape
//!
//! ```json
//! {
//!   "primaryKey": "EBS-4f1c...",
//!   "Tags": [{ "Key": "fuse:product", "Value": "Care" }],
//!   "VolumeId": "vol-0abc",
//!   "Attachments": [{ "InstanceId": "i-123", "State": "attached" }]
//! }
//! ```
//!
//! The type prefix of the primary key selects the resource type; the
//! remaining fields are type specific and looked up by their describe-API
//! names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Primary key '{0}' does not carry a resource type prefix")]
    MissingTypePrefix(String),

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Malformed resource document: {0}")]
    Malformed(String),
}

/// Cloud resource families the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    /// Compute instance
    Ec2,
    /// Block volume
    Ebs,
    /// Object storage bucket
    S3,
    /// Managed database
    Rds,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [Self::Ec2, Self::Ebs, Self::S3, Self::Rds];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
            Self::Ebs => "EBS",
            Self::S3 => "S3",
            Self::Rds => "RDS",
        }
    }

    /// Describe-API field holding this type's natural identifier.
    fn identifier_field(&self) -> &'static str {
        match self {
            Self::Ec2 => "InstanceId",
            Self::Ebs => "VolumeId",
            Self::S3 => "Name",
            Self::Rds => "DBInstanceIdentifier",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EC2" => Ok(Self::Ec2),
            "EBS" => Ok(Self::Ebs),
            "S3" => Ok(Self::S3),
            "RDS" => Ok(Self::Rds),
            other => Err(SnapshotError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Identity of a resource across the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub resource_type: ResourceType,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource_type, self.resource_id)
    }
}

/// A single raw key/value tag, in the cloud APIs' wire casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachment {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Type-specific identifiers carried alongside the tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDetails {
    Instance,
    Volume {
        #[serde(default)]
        attachments: Vec<VolumeAttachment>,
    },
    Bucket,
    Database {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arn: Option<String>,
    },
}

/// Document as written by the import collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResourceDocument {
    #[serde(rename = "primaryKey", alias = "_pk")]
    pub primary_key: String,

    #[serde(default, alias = "Tags", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Immutable snapshot of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub primary_key: String,
    pub raw_tags: Vec<Tag>,
    pub details: ResourceDetails,
}

impl ResourceSnapshot {
    /// Build a snapshot from an import document.
    ///
    /// A missing tag list is treated as an empty one so the batch keeps going;
    /// the resource will then show every required tag as unmatched.
    pub fn from_document(doc: RawResourceDocument) -> Result<Self, SnapshotError> {
        let (prefix, opaque_id) = doc
            .primary_key
            .split_once('-')
            .ok_or_else(|| SnapshotError::MissingTypePrefix(doc.primary_key.clone()))?;
        let resource_type: ResourceType = prefix.parse()?;

        let resource_id = doc
            .fields
            .get(resource_type.identifier_field())
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(opaque_id)
            .to_string();

        let details = match resource_type {
            ResourceType::Ec2 => ResourceDetails::Instance,
            ResourceType::S3 => ResourceDetails::Bucket,
            ResourceType::Ebs => ResourceDetails::Volume {
                attachments: parse_attachments(doc.fields.get("Attachments"))?,
            },
            ResourceType::Rds => ResourceDetails::Database {
                arn: doc
                    .fields
                    .get("DBInstanceArn")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
        };

        Ok(Self {
            resource_type,
            resource_id,
            primary_key: doc.primary_key,
            raw_tags: doc.tags.unwrap_or_default(),
            details,
        })
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, self.resource_id.clone())
    }

    /// Value of the first raw tag whose key matches exactly.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.raw_tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Raw tags as a key/value map (later duplicates overwrite earlier ones).
    pub fn tag_map(&self) -> BTreeMap<String, String> {
        self.raw_tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect()
    }

    /// Instance the volume is attached to; only the first attachment counts.
    pub fn attached_instance(&self) -> Option<&str> {
        match &self.details {
            ResourceDetails::Volume { attachments } => {
                attachments.first().map(|a| a.instance_id.as_str())
            }
            _ => None,
        }
    }

    /// Identifier the tag-write API addresses.
    pub fn write_target(&self) -> &str {
        match &self.details {
            ResourceDetails::Database { arn: Some(arn) } if !arn.is_empty() => arn,
            _ => &self.resource_id,
        }
    }
}

fn parse_attachments(value: Option<&Value>) -> Result<Vec<VolumeAttachment>, SnapshotError> {
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    let mut attachments = Vec::with_capacity(items.len());
    for item in items {
        let instance_id = item
            .get("InstanceId")
            .and_then(Value::as_str)
            .ok_or_else(|| SnapshotError::Malformed("attachment without InstanceId".to_string()))?;
        attachments.push(VolumeAttachment {
            instance_id: instance_id.to_string(),
            state: item.get("State").and_then(Value::as_str).map(str::to_string),
        });
    }
    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> RawResourceDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parses_volume_with_attachment() {
        let snapshot = ResourceSnapshot::from_document(doc(json!({
            "_pk": "EBS-1234",
            "Tags": [{ "Key": "Name", "Value": "data" }],
            "VolumeId": "vol-1",
            "Attachments": [{ "InstanceId": "i-123", "State": "attached" }]
        })))
        .unwrap();

        assert_eq!(snapshot.resource_type, ResourceType::Ebs);
        assert_eq!(snapshot.resource_id, "vol-1");
        assert_eq!(snapshot.attached_instance(), Some("i-123"));
        assert_eq!(snapshot.tag_value("Name"), Some("data"));
    }

    #[test]
    fn test_missing_tags_default_to_empty() {
        let snapshot = ResourceSnapshot::from_document(doc(json!({
            "primaryKey": "S3-abc",
            "Name": "bucket-a"
        })))
        .unwrap();

        assert!(snapshot.raw_tags.is_empty());
        assert_eq!(snapshot.resource_id, "bucket-a");
    }

    #[test]
    fn test_database_writes_address_the_arn() {
        let snapshot = ResourceSnapshot::from_document(doc(json!({
            "primaryKey": "RDS-9",
            "DBInstanceIdentifier": "orders-db",
            "DBInstanceArn": "arn:aws:rds:us-east-1:1:db:orders-db"
        })))
        .unwrap();

        assert_eq!(snapshot.resource_id, "orders-db");
        assert_eq!(snapshot.write_target(), "arn:aws:rds:us-east-1:1:db:orders-db");
    }

    #[test]
    fn test_identifier_falls_back_to_opaque_id() {
        let snapshot = ResourceSnapshot::from_document(doc(json!({ "primaryKey": "EC2-i-777" })))
            .unwrap();
        assert_eq!(snapshot.resource_id, "i-777");
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err = ResourceSnapshot::from_document(doc(json!({ "primaryKey": "LOG-1" }))).unwrap_err();
        assert_eq!(err, SnapshotError::UnknownResourceType("LOG".to_string()));
    }
}
