// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Origin Guard CLI
//!
//! The `origin-guard` binary hosts the PersistentVolume admission webhook and
//! the operator tooling around it.
//!
//! ## Commands
//!
//! - `origin-guard serve` - Run the mutating and validating webhook
//! - `origin-guard backfill [NAME] [--all]` - Copy bound claim namespaces into `origin`
//! - `origin-guard check --new FILE [--old FILE]` - Evaluate snapshots offline
//! - `origin-guard config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use origin_guard::commands::{self, BackfillArgs, CheckArgs, ConfigCommand, ServeArgs};
use origin_guard::logging::init_logging;
use origin_guard_core::domain::config::{LogFormat, LoggingConfig, WebhookConfigManifest};

/// Origin Guard - provenance for shared PersistentVolumes
#[derive(Parser)]
#[command(name = "origin-guard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ORIGIN_GUARD_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true, env = "ORIGIN_GUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format; overrides the config file
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admission webhook server
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Backfill `origin` on volumes that got bound after creation
    #[command(name = "backfill")]
    Backfill(BackfillArgs),

    /// Run defaulting and validation against volume snapshots offline
    #[command(name = "check")]
    Check(CheckArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = WebhookConfigManifest::load_or_default(cli.config.clone());

    let logging = config
        .as_ref()
        .map(|c| c.spec.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli.log_level.as_deref().unwrap_or(&logging.level);
    let format = cli.log_format.map(LogFormat::from).unwrap_or(logging.format);
    init_logging(level, format)?;

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(ready(config)?, args).await,
        Commands::Backfill(args) => commands::backfill::execute(ready(config)?, args).await,
        Commands::Check(args) => commands::check::execute(ready(config)?, args).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}

fn ready(config: Result<WebhookConfigManifest>) -> Result<WebhookConfigManifest> {
    let config = config.context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}
