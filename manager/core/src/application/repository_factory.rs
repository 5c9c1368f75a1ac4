// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete document store for the configured backend, keeping
//! the domain layer free of adapter types.

use std::sync::Arc;

use crate::domain::repository::{DocumentStore, RepositoryError, StorageBackend};
use crate::infrastructure::repositories::sled_store::SledDocumentStore;
use crate::infrastructure::repositories::InMemoryDocumentStore;

/// Creates a DocumentStore implementation based on the configured backend
pub fn create_document_store(
    backend: &StorageBackend,
) -> Result<Arc<dyn DocumentStore>, RepositoryError> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryDocumentStore::new())),
        StorageBackend::Sled { path } => Ok(Arc::new(SledDocumentStore::open(path)?)),
    }
}
