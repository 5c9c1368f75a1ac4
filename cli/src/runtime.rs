// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Wiring shared by the store-backed commands.
//!
//! Loads the manager configuration, opens the configured document store and
//! builds the [`TagManagerService`] with a tracing event sink.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use tag_manager_core::application::repository_factory::create_document_store;
use tag_manager_core::application::{TagManagerService, TagRecords};
use tag_manager_core::domain::events::EventSink;
use tag_manager_core::domain::manager_config::ManagerConfig;
use tag_manager_core::infrastructure::audit::TracingEventSink;

pub struct ManagerRuntime {
    pub config: ManagerConfig,
    pub records: TagRecords,
    pub service: TagManagerService,
}

impl ManagerRuntime {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config = ManagerConfig::load_or_default(config_override)
            .context("Failed to load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: ManagerConfig) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let backend = config.store.backend();
        debug!(?backend, "Opening document store");
        let store = create_document_store(&backend).context("Failed to open document store")?;

        let events: Arc<dyn EventSink> = Arc::new(TracingEventSink::new());
        let records = TagRecords::new(store, events.clone());
        let service = TagManagerService::new(records.clone(), config.clone(), events);

        Ok(Self {
            config,
            records,
            service,
        })
    }
}
