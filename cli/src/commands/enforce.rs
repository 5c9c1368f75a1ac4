// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! `tagman enforce` - plan tag corrections and dispatch them
//!
//! The writer is a dry run unless `--plan-out` is given, in which case every
//! action is appended to that file as a JSON line. Ctrl-C stops issuing new
//! writes; writes already in flight finish.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tag_manager_core::application::DispatchReport;
use tag_manager_core::domain::enforcement::{EnforcementAction, TagWriter};
use tag_manager_core::infrastructure::tag_writer::{api_call_name, DryRunTagWriter, PlanFileTagWriter};

use crate::runtime::ManagerRuntime;

#[derive(clap::Args, Debug, Clone, Default)]
pub struct EnforceArgs {
    /// Append planned writes to this file (JSON lines) instead of a dry run
    #[arg(long, value_name = "FILE")]
    pub plan_out: Option<PathBuf>,

    /// Print every planned action
    #[arg(long)]
    pub show: bool,
}

pub async fn handle_command(args: EnforceArgs, config_override: Option<PathBuf>) -> Result<()> {
    let runtime = ManagerRuntime::load(config_override)?;
    enforce_with(&runtime, &args).await
}

pub async fn enforce_with(runtime: &ManagerRuntime, args: &EnforceArgs) -> Result<()> {
    let actions = runtime
        .service
        .plan_enforcement()
        .await
        .context("Failed to plan enforcement")?;
    if args.show {
        print_actions(&actions);
    }

    let writer: Arc<dyn TagWriter> = match &args.plan_out {
        Some(path) => Arc::new(PlanFileTagWriter::new(path.clone())),
        None => Arc::new(DryRunTagWriter),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining writes");
            on_signal.cancel();
        }
    });

    let report = runtime
        .service
        .dispatch_actions(actions, writer, cancel)
        .await;
    signal_task.abort();

    print_report(&report, args.plan_out.as_ref());
    if !report.failed.is_empty() {
        anyhow::bail!("{} tag writes failed", report.failed.len());
    }
    Ok(())
}

fn print_actions(actions: &[EnforcementAction]) {
    if actions.is_empty() {
        println!("{}", "No tag changes required".dimmed());
        return;
    }
    println!("{}", format!("Planned actions ({}):", actions.len()).bold());
    for action in actions {
        println!(
            "  {} {} via {}",
            action.resource_type,
            action.resource_id.bold(),
            api_call_name(action.semantics())
        );
        for (key, value) in &action.tags_to_write {
            println!("    {} = {}", key, value);
        }
    }
    println!();
}

fn print_report(report: &DispatchReport, plan_out: Option<&PathBuf>) {
    let headline = format!(
        "Enforcement finished: {} succeeded, {} failed, {} cancelled",
        report.succeeded.len(),
        report.failed.len(),
        report.cancelled.len()
    );
    if report.is_clean() {
        println!("{}", format!("✓ {}", headline).green());
    } else {
        println!("{}", format!("⚠ {}", headline).yellow());
    }

    for (resource, error) in &report.failed {
        println!("  {} {}: {}", "✗".red(), resource, error);
    }
    if let Some(path) = plan_out {
        println!("  Plan written to {}", path.display());
    }
}
