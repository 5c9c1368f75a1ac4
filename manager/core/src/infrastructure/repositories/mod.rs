// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! Document Store Implementations
//!
//! Adapters for the [`DocumentStore`] port defined in the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist snapshots, policy documents and analyses
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **SledDocumentStore** - embedded on-disk store, one sled tree of JSON values
//! - **InMemoryDocumentStore** - ordered map for tests and one-shot runs

pub mod sled_store;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::domain::repository::{DocumentStore, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Database("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, key: &str, document: &Value) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        documents.insert(key.to_string(), document.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        documents.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, RepositoryError> {
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
