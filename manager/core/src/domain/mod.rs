// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Domain types for tag policy enforcement.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Policy value objects, resource snapshots, analyses,
//!   enforcement actions, events and the persistence/write ports

pub mod analysis;
pub mod enforcement;
pub mod events;
pub mod manager_config;
pub mod org;
pub mod policy;
pub mod repository;
pub mod resource;
