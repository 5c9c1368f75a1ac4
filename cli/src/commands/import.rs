// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! `tagman import` - replace the stored resource snapshots with an export file

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

use tag_manager_core::infrastructure::loader;

use crate::runtime::ManagerRuntime;

pub async fn handle_command(file: PathBuf, config_override: Option<PathBuf>) -> Result<()> {
    let runtime = ManagerRuntime::load(config_override)?;
    import_into(&runtime, &file).await
}

pub async fn import_into(runtime: &ManagerRuntime, file: &Path) -> Result<()> {
    let documents = loader::read_resource_file(file)?;
    let total = documents.len();
    let stored = runtime.records.replace_snapshots(documents).await?;

    println!(
        "{}",
        format!("✓ Imported {} of {} resource documents", stored, total).green()
    );
    if stored < total {
        println!(
            "  {}",
            format!("{} documents skipped (see log)", total - stored).yellow()
        );
    }
    Ok(())
}
