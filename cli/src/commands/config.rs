// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use tag_manager_core::domain::manager_config::{ManagerConfig, StoreKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./tagman-config.yaml)
        #[arg(short, long, default_value = "./tagman-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. TAGMAN_CONFIG_PATH: {}",
            std::env::var("TAGMAN_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./tagman-config.yaml");
        println!("  4. ~/.tagman/config.yaml");
        println!("  5. /etc/tagman/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Store:".bold());
    match config.store.backend {
        StoreKind::Memory => println!("  Backend: memory {}", "(not persisted)".dimmed()),
        StoreKind::Sled => {
            println!("  Backend: sled");
            println!("  Path: {}", config.store.path.display());
        }
    }
    println!();

    println!("{}", "Association:".bold());
    println!("  Product tag: {}", config.association.product_tag);
    println!("  Org/space tag: {}", config.association.org_space_tag);
    println!("  Conflict policy: {:?}", config.association.conflict_policy);
    println!();

    println!("{}", "Enforcement:".bold());
    let enforcement = &config.enforcement;
    println!("  Sentinel prefix: {}", enforcement.sentinel_prefix);
    println!("  Max in flight: {}", enforcement.max_in_flight);
    println!("  Call timeout: {}s", enforcement.call_timeout_seconds);
    println!(
        "  Retries: {} (backoff {}ms → {}ms, jitter {})",
        enforcement.max_retries,
        enforcement.base_backoff_ms,
        enforcement.max_backoff_ms,
        if enforcement.jitter { "on" } else { "off" }
    );
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ManagerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
