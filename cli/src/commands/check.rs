// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Offline evaluation of volume snapshots
//!
//! Runs the defaulter and the validator exactly as the webhook would, with
//! sibling candidates read from a file instead of the API server. Snapshots
//! may be JSON or YAML (`kubectl get pv -o yaml` output works as is).

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use origin_guard_core::application::defaulter::{DefaultOutcome, ProvenanceDefaulter};
use origin_guard_core::application::validator::ProvenanceValidator;
use origin_guard_core::domain::config::WebhookConfigManifest;
use origin_guard_core::domain::provenance::OriginSource;
use origin_guard_core::domain::volume::{Volume, VolumeList};
use origin_guard_core::infrastructure::InMemoryVolumeRepository;
use origin_guard_core::presentation::admission::origin_patch;

#[derive(Args)]
pub struct CheckArgs {
    /// Incoming PersistentVolume
    #[arg(long, value_name = "FILE")]
    pub new: PathBuf,

    /// Stored PersistentVolume; treated as a create when omitted
    #[arg(long, value_name = "FILE")]
    pub old: Option<PathBuf>,

    /// Other volumes in the cluster (a list or a `PersistentVolumeList`)
    #[arg(long, value_name = "FILE")]
    pub candidates: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Candidates {
    Items(Vec<Volume>),
    List(VolumeList),
}

/// Result of a check run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub volume: String,
    pub defaulting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Value>,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn execute(config: WebhookConfigManifest, args: CheckArgs) -> Result<()> {
    let new = load_volume(&args.new)?;
    let old = args.old.as_deref().map(load_volume).transpose()?;
    let candidates = match &args.candidates {
        Some(path) => load_candidates(path)?,
        None => Vec::new(),
    };

    let report = evaluate(&config, new, old, candidates).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.allowed {
        anyhow::bail!("{} would be rejected", report.volume);
    }
    Ok(())
}

/// Default `new`, then validate it against `old`
pub async fn evaluate(
    config: &WebhookConfigManifest,
    new: Volume,
    old: Option<Volume>,
    candidates: Vec<Volume>,
) -> Result<CheckReport> {
    let spec = &config.spec;
    let repo = Arc::new(InMemoryVolumeRepository::with_volumes(candidates));
    let defaulter = ProvenanceDefaulter::new(
        spec.target_driver.clone(),
        repo,
        spec.resolution.candidate_order,
    );
    let validator = ProvenanceValidator::new(spec.target_driver.clone());

    let mut defaulted = new.clone();
    let outcome = match defaulter.apply_default(&mut defaulted).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return Ok(CheckReport {
                volume: new.name().to_string(),
                defaulting: "failed".to_string(),
                patch: None,
                allowed: false,
                message: Some(e.to_string()),
            })
        }
    };

    let patch = match (outcome.mutated(), defaulted.origin()) {
        (true, Some(namespace)) => Some(origin_patch(&new, namespace)),
        _ => None,
    };

    let verdict = match &old {
        Some(old) => validator.validate_update(old, &defaulted),
        None => validator.validate_create(&defaulted),
    };

    Ok(CheckReport {
        volume: new.name().to_string(),
        defaulting: describe(&outcome),
        patch,
        allowed: verdict.is_ok(),
        message: verdict.err().map(|v| v.to_string()),
    })
}

fn describe(outcome: &DefaultOutcome) -> String {
    match outcome {
        DefaultOutcome::Skipped(reason) => format!("skipped: {}", reason),
        DefaultOutcome::AlreadySet { origin } => format!("origin already '{}'", origin),
        DefaultOutcome::Assigned {
            namespace,
            source: OriginSource::ClaimRef,
        } => format!("origin '{}' from claimRef", namespace),
        DefaultOutcome::Assigned {
            namespace,
            source: OriginSource::SiblingVolume { volume, claim },
        } => format!(
            "origin '{}' from sibling volume {} (claim {}/{})",
            namespace, volume, namespace, claim
        ),
        DefaultOutcome::NoOpinion(reason) => format!("no opinion: {}", reason),
    }
}

fn read_snapshot<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn load_volume(path: &Path) -> Result<Volume> {
    read_snapshot(path)
}

fn load_candidates(path: &Path) -> Result<Vec<Volume>> {
    Ok(match read_snapshot(path)? {
        Candidates::Items(items) => items,
        Candidates::List(list) => list.items,
    })
}

fn print_report(report: &CheckReport) {
    println!("{} {}", "Volume:".bold(), report.volume);
    println!("  Defaulting: {}", report.defaulting);
    if let Some(patch) = &report.patch {
        println!("  Patch: {}", patch);
    }
    if report.allowed {
        println!("  {}", "✓ Allowed".green());
    } else {
        println!("  {}", "✗ Denied".red());
        if let Some(message) = &report.message {
            println!("    {}", message);
        }
    }
}
