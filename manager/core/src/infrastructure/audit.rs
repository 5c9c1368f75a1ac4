// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Event sink adapters.
//!
//! [`TracingEventSink`] is what the CLI wires in. [`RecordingEventSink`] keeps
//! every event in memory so tests (and run summaries) can inspect them.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::domain::events::{EngineEvent, EventLevel, EventSink};

/// Forwards events to `tracing` at their own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: EngineEvent) {
        match event.level() {
            EventLevel::Debug => debug!(target: "tag_manager::events", "{}", event),
            EventLevel::Info => info!(target: "tag_manager::events", "{}", event),
            EventLevel::Warn => warn!(target: "tag_manager::events", "{}", event),
            EventLevel::Error => error!(target: "tag_manager::events", "{}", event),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count_at_least(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level() >= level).count()
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: EngineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Sends every event to each inner sink.
#[derive(Clone, Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: EngineEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
