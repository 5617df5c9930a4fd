// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Webhook server
//!
//! Serves HTTPS when a certificate is configured (`spec.server.tls` or
//! `--tls-cert`/`--tls-key`), plain HTTP otherwise. The API server only calls
//! webhooks over HTTPS, so plain HTTP needs TLS terminated in front.

use anyhow::{Context, Result};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use origin_guard_core::application::defaulter::ProvenanceDefaulter;
use origin_guard_core::application::validator::ProvenanceValidator;
use origin_guard_core::domain::config::{ServerConfig, TlsConfig, WebhookConfigManifest};
use origin_guard_core::infrastructure::KubeApiClient;
use origin_guard_core::presentation::admission::{app, AppState};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (default: spec.server.bindAddress)
    #[arg(long, env = "ORIGIN_GUARD_HOST")]
    pub host: Option<String>,

    /// Listen port (default: spec.server.port)
    #[arg(long, env = "ORIGIN_GUARD_PORT")]
    pub port: Option<u16>,

    /// PEM certificate chain (default: spec.server.tls.certPath)
    #[arg(long, env = "ORIGIN_GUARD_TLS_CERT", value_name = "FILE", requires = "tls_key")]
    pub tls_cert: Option<String>,

    /// PEM private key (default: spec.server.tls.keyPath)
    #[arg(long, env = "ORIGIN_GUARD_TLS_KEY", value_name = "FILE", requires = "tls_cert")]
    pub tls_key: Option<String>,
}

pub async fn execute(config: WebhookConfigManifest, args: ServeArgs) -> Result<()> {
    let spec = &config.spec;
    let client = KubeApiClient::from_config(&spec.cluster)
        .context("Failed to create Kubernetes API client")?;

    let state = Arc::new(AppState {
        defaulter: ProvenanceDefaulter::new(
            spec.target_driver.clone(),
            Arc::new(client),
            spec.resolution.candidate_order,
        ),
        validator: ProvenanceValidator::new(spec.target_driver.clone()),
    });

    let tls = resolve_tls(&args, &spec.server);
    let host = args.host.unwrap_or_else(|| spec.server.bind_address.clone());
    let port = args.port.unwrap_or(spec.server.port);
    let addr = format!("{}:{}", host, port);

    info!(
        addr = %addr,
        tls = tls.is_some(),
        target_driver = %spec.target_driver,
        candidate_order = ?spec.resolution.candidate_order,
        api_server = %spec.cluster.api_server,
        "Starting webhook"
    );

    match tls {
        Some(tls) => serve_https(&addr, app(state), &tls).await?,
        None => serve_http(&addr, app(state)).await?,
    }

    info!("Webhook shutting down");

    Ok(())
}

/// Command-line certificate flags win over `spec.server.tls`
fn resolve_tls(args: &ServeArgs, server: &ServerConfig) -> Option<TlsConfig> {
    match (&args.tls_cert, &args.tls_key) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        }),
        _ => server.tls.clone(),
    }
}

/// Load the certificate chain and key for the HTTPS listener
pub async fn load_tls(tls: &TlsConfig) -> Result<RustlsConfig> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificate {} with key {}",
                tls.cert_path, tls.key_path
            )
        })
}

async fn serve_https(addr: &str, app: Router, tls: &TlsConfig) -> Result<()> {
    let socket: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", addr))?;
    let rustls = load_tls(tls).await?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!(addr = %addr, cert = %tls.cert_path, "Webhook listening (HTTPS)");

    axum_server::bind_rustls(socket, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("HTTPS server failed")
}

async fn serve_http(addr: &str, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    warn!(addr = %addr, "Webhook listening (plain HTTP); TLS must be terminated in front");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_on_signal(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
