// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! # Tag Manager CLI
//!
//! The `tagman` binary drives the tag policy engine against a local document
//! store.
//!
//! ## Commands
//!
//! - `tagman config show|validate|generate` - Configuration management
//! - `tagman policy load|validate|resolve` - Tag policy documents
//! - `tagman import <FILE>` - Replace stored resource snapshots
//! - `tagman analyze` - Classify resources and apply association rules
//! - `tagman enforce` - Plan and dispatch tag corrections
//! - `tagman report` - Resources without a valid product tag
//! - `tagman run` - All of the above in one pass

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use tag_manager::commands::{self, ConfigCommand, EnforceArgs, PolicyCommand, ReportFormat, RunArgs};

/// Tag Manager - resolve and enforce cloud resource tag policy
#[derive(Parser)]
#[command(name = "tagman")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TAGMAN_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TAGMAN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Tag policy management
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Replace stored resource snapshots with an export file
    #[command(name = "import")]
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run an analysis cycle over the stored snapshots
    #[command(name = "analyze")]
    Analyze,

    /// Plan and dispatch tag corrections
    #[command(name = "enforce")]
    Enforce {
        #[command(flatten)]
        args: EnforceArgs,
    },

    /// Report resources without a valid product tag
    #[command(name = "report")]
    Report {
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },

    /// Load policy, import, analyze and enforce in one pass
    #[command(name = "run")]
    Run {
        #[command(flatten)]
        args: RunArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let result = match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Policy { command }) => {
            commands::policy::handle_command(command, cli.config).await
        }
        Some(Commands::Import { file }) => commands::import::handle_command(file, cli.config).await,
        Some(Commands::Analyze) => commands::analyze::handle_command(cli.config).await,
        Some(Commands::Enforce { args }) => commands::enforce::handle_command(args, cli.config).await,
        Some(Commands::Report { format }) => commands::report::handle_command(format, cli.config).await,
        Some(Commands::Run { args }) => commands::run::handle_command(args, cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
