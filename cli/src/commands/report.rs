// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! `tagman report` - resources still lacking a valid product tag

use anyhow::Result;
use clap::ValueEnum;
use std::path::PathBuf;

use tag_manager_core::application::report::{missing_product_report, to_csv, to_json};

use crate::runtime::ManagerRuntime;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

pub async fn handle_command(format: ReportFormat, config_override: Option<PathBuf>) -> Result<()> {
    let runtime = ManagerRuntime::load(config_override)?;
    let policy = runtime.records.load_policy().await?;
    let analyses = runtime.records.load_analyses().await?;

    let product_tag = policy.resolve_canonical_key(&runtime.config.association.product_tag);
    let entries = missing_product_report(&analyses, &product_tag);

    match format {
        ReportFormat::Json => println!("{}", to_json(&entries)?),
        ReportFormat::Csv => print!("{}", to_csv(&entries)),
    }
    Ok(())
}
