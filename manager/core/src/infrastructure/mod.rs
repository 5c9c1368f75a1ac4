// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

pub mod audit;
pub mod loader;
pub mod repositories;
pub mod tag_writer;
