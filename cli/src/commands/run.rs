// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! `tagman run` - load policy, import, analyse and enforce in one go

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use tag_manager_core::domain::manager_config::{ManagerConfig, StoreKind};

use crate::commands::enforce::{self, EnforceArgs};
use crate::commands::{analyze, import, policy};
use crate::runtime::ManagerRuntime;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Policy document (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub policy: PathBuf,

    /// Resource export (JSON or YAML array, or object keyed by primary key)
    #[arg(long, value_name = "FILE")]
    pub resources: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub org_directory: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub org_products: Option<PathBuf>,

    /// Keep everything in memory instead of the configured store
    #[arg(long)]
    pub ephemeral: bool,

    #[command(flatten)]
    pub enforce: EnforceArgs,
}

pub async fn handle_command(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut config = ManagerConfig::load_or_default(config_override)?;
    if args.ephemeral {
        config.store.backend = StoreKind::Memory;
    }
    let runtime = ManagerRuntime::from_config(config)?;

    policy::store_documents(
        &runtime,
        &args.policy,
        args.org_directory.as_deref(),
        args.org_products.as_deref(),
    )
    .await?;
    import::import_into(&runtime, &args.resources).await?;
    analyze::analyze_with(&runtime).await?;
    enforce::enforce_with(&runtime, &args.enforce).await
}
