// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Tag Manager Core
//!
//! Tag policy resolution and enforcement engine: normalizes tag key aliases,
//! classifies each resource's tags against the policy, derives values that
//! can be auto-populated, applies cross-resource association rules, and
//! computes the tag writes that bring resources into compliance.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, engine components and adapters used by the
//!   `tagman` CLI

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
