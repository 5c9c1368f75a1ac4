// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! Policy commands
//!
//! Commands: load, validate, resolve

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use tag_manager_core::domain::policy::{Derivation, TagPolicyConfig};
use tag_manager_core::infrastructure::loader;

use crate::runtime::ManagerRuntime;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Validate a policy file and store it with optional org documents
    Load {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Org directory document ({"orgs": {id: name}})
        #[arg(long, value_name = "FILE")]
        org_directory: Option<PathBuf>,

        /// Org to product map ({"orgProducts": {org: product}})
        #[arg(long, value_name = "FILE")]
        org_products: Option<PathBuf>,
    },

    /// Validate a policy file without storing it
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show which canonical tag a raw key resolves to
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "KEY")]
        key: String,
    },
}

pub async fn handle_command(command: PolicyCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        PolicyCommand::Load {
            file,
            org_directory,
            org_products,
        } => load(config_override, file, org_directory, org_products).await,
        PolicyCommand::Validate { file } => validate(file),
        PolicyCommand::Resolve { file, key } => resolve(file, &key),
    }
}

pub async fn load(
    config_override: Option<PathBuf>,
    file: PathBuf,
    org_directory: Option<PathBuf>,
    org_products: Option<PathBuf>,
) -> Result<()> {
    let runtime = ManagerRuntime::load(config_override)?;
    store_documents(&runtime, &file, org_directory.as_deref(), org_products.as_deref()).await
}

/// Store the policy and org documents through an already-open runtime.
pub async fn store_documents(
    runtime: &ManagerRuntime,
    file: &Path,
    org_directory: Option<&Path>,
    org_products: Option<&Path>,
) -> Result<()> {
    let (document, _) = loader::read_policy_file(file)?;
    let policy = runtime.records.store_policy(&document).await?;

    let directory = org_directory.map(loader::read_org_directory).transpose()?;
    let products = org_products.map(loader::read_org_products).transpose()?;
    runtime
        .records
        .store_org_documents(directory.as_ref(), products.as_ref())
        .await?;

    println!(
        "{}",
        format!("✓ Policy stored ({} tags)", policy.len()).green()
    );
    if let Some(directory) = &directory {
        println!("  Org directory: {} orgs", directory.orgs.len());
    }
    if let Some(products) = &products {
        println!("  Org products: {} mappings", products.org_products.len());
    }
    Ok(())
}

fn validate(file: PathBuf) -> Result<()> {
    let (_, policy) = loader::read_policy_file(&file)?;
    println!("{}", "✓ Policy is valid".green());
    println!();
    print_policy(&policy);
    Ok(())
}

fn resolve(file: PathBuf, key: &str) -> Result<()> {
    let (_, policy) = loader::read_policy_file(&file)?;
    match policy.lookup_canonical(key) {
        Some(canonical) => println!("{} → {}", key, canonical.bold()),
        None => println!("{} → {}", key, "(unmanaged)".dimmed()),
    }
    Ok(())
}

fn print_policy(policy: &TagPolicyConfig) {
    for tag in policy.tags() {
        let required = if tag.required {
            "required".yellow().to_string()
        } else {
            "optional".dimmed().to_string()
        };
        println!("  {} ({})", tag.canonical.bold(), required);
        println!("    Aliases: {}", tag.aliases.join(", "));
        if !tag.allowed_values.is_empty() {
            println!("    Values: {}", tag.allowed_values.join(", "));
        }
        match &tag.derivation {
            Derivation::None => {}
            Derivation::AlwaysPopulate => println!("    Derivation: alwaysPopulate"),
            Derivation::CopyValue { reference } => {
                println!("    Derivation: copyValue from {}", reference)
            }
            Derivation::LookupValue { reference, table } => println!(
                "    Derivation: lookupValue from {} ({} entries)",
                reference,
                table.len()
            ),
        }
    }
}
