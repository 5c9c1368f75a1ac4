// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! Sled-backed document store.
//!
//! Documents are JSON-encoded into a single named tree. Sled keeps keys in
//! byte order, which gives prefix scans ordered by key for free.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::domain::repository::{DocumentStore, RepositoryError};

const DOCUMENT_TREE: &str = "documents";

#[derive(Clone)]
pub struct SledDocumentStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening sled document store");
        let db = sled::open(path)?;
        let tree = db.open_tree(DOCUMENT_TREE)?;
        Ok(Self { db, tree })
    }

    pub async fn flush(&self) -> Result<(), RepositoryError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SledDocumentStore {
    async fn put(&self, key: &str, document: &Value) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(document)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, RepositoryError> {
        let mut documents = Vec::new();
        for entry in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, bytes) = entry?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            documents.push((key, serde_json::from_slice(&bytes)?));
        }
        Ok(documents)
    }
}
