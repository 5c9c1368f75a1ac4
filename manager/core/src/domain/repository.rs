// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! # Document Store Interface
//!
//! The engine persists everything (snapshots, policy documents, analyses) as
//! JSON documents in a key-value store that supports prefix scans. The trait
//! lives in the domain layer; adapters live in
//! `crate::infrastructure::repositories`.
//!
//! | Key | Document |
//! |-----|----------|
//! | `EC2-…`, `EBS-…`, `S3-…`, `RDS-…` | resource snapshot from the importer |
//! | [`POLICY_KEY`] | tag policy document |
//! | [`ORG_DIRECTORY_KEY`] | org id → org name |
//! | [`ORG_PRODUCTS_KEY`] | org name → product |
//! | `ANALYSIS-<uuid>` | one analysis record per resource |

use async_trait::async_trait;
use serde_json::Value;

pub const POLICY_KEY: &str = "CONFIG-1000";
pub const ORG_DIRECTORY_KEY: &str = "ORG_DIRECTORY-1000";
pub const ORG_PRODUCTS_KEY: &str = "ORG_PRODUCTS-1000";

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Sled { path: std::path::PathBuf },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace the document under `key`
    async fn put(&self, key: &str, document: &Value) -> Result<(), RepositoryError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, RepositoryError>;

    /// Delete `key`; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), RepositoryError>;

    /// All documents whose key starts with `prefix`, ordered by key
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for RepositoryError {
    fn from(err: sled::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
