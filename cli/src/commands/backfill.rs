// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot origin backfill against the cluster

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use origin_guard_core::application::backfill::{BackfillOutcome, BackfillSummary, OriginBackfill};
use origin_guard_core::domain::config::WebhookConfigManifest;
use origin_guard_core::infrastructure::KubeApiClient;

#[derive(Args)]
pub struct BackfillArgs {
    /// PersistentVolume to reconcile
    #[arg(value_name = "NAME", required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Reconcile every volume of the target driver
    #[arg(long)]
    pub all: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(config: WebhookConfigManifest, args: BackfillArgs) -> Result<()> {
    let client = Arc::new(
        KubeApiClient::from_config(&config.spec.cluster)
            .context("Failed to create Kubernetes API client")?,
    );
    let backfill = OriginBackfill::new(config.spec.target_driver.clone(), client.clone(), client);

    match args.name {
        Some(name) => {
            let outcome = backfill
                .reconcile(&name)
                .await
                .with_context(|| format!("Failed to backfill {}", name))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&name, &outcome);
            }
            Ok(())
        }
        None => {
            let summary = backfill
                .reconcile_all()
                .await
                .context("Failed to list PersistentVolumes")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            if !summary.failed.is_empty() {
                anyhow::bail!("{} volume(s) could not be backfilled", summary.failed.len());
            }
            Ok(())
        }
    }
}

fn print_outcome(name: &str, outcome: &BackfillOutcome) {
    match outcome {
        BackfillOutcome::Backfilled { namespace } => {
            println!("{}", format!("✓ {}: origin set to '{}'", name, namespace).green())
        }
        BackfillOutcome::Unchanged { origin } => {
            println!("{}: origin already '{}'", name, origin)
        }
        BackfillOutcome::Unbound => {
            println!("{}", format!("{}: not bound to a claim, nothing to copy", name).yellow())
        }
        BackfillOutcome::Skipped { reason } => {
            println!("{}", format!("{}: skipped ({})", name, reason).dimmed())
        }
        BackfillOutcome::NotFound => {
            println!("{}", format!("{}: not found", name).yellow())
        }
    }
}

fn print_summary(summary: &BackfillSummary) {
    println!("{}", "Origin backfill:".bold());
    println!("  Backfilled: {}", summary.backfilled.len());
    for name in &summary.backfilled {
        println!("    - {}", name);
    }
    println!("  Unchanged: {}", summary.unchanged);
    println!("  Unbound: {}", summary.unbound.len());
    for name in &summary.unbound {
        println!("    - {}", name.dimmed());
    }
    println!("  Skipped: {}", summary.skipped);
    if !summary.failed.is_empty() {
        println!("  {}: {}", "Failed".red(), summary.failed.len());
        for (name, error) in &summary.failed {
            println!("    - {}: {}", name, error);
        }
    }
}
