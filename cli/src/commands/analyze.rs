// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! `tagman analyze` - run one analysis cycle over the stored snapshots

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use tag_manager_core::application::AnalysisSummary;

use crate::runtime::ManagerRuntime;

pub async fn handle_command(config_override: Option<PathBuf>) -> Result<()> {
    let runtime = ManagerRuntime::load(config_override)?;
    analyze_with(&runtime).await
}

pub async fn analyze_with(runtime: &ManagerRuntime) -> Result<()> {
    let summary = runtime
        .service
        .run_analysis_cycle()
        .await
        .context("Analysis cycle failed")?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &AnalysisSummary) {
    println!("{}", "✓ Analysis complete".green());
    println!("  Resources: {}", summary.resources);
    println!("  Compliant: {}", summary.compliant);
    println!("  With invalid tags: {}", summary.with_invalid_tags);
    println!("  With missing tags: {}", summary.with_missing_tags);
    println!("  Resolved by association: {}", summary.superseded);
}
