// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use openforge_daemon::config::DaemonConfig;
use openforge_daemon::http;
use openforge_daemon::service::Services;

#[derive(Debug, Parser)]
#[command(name = "openforge-daemon")]
#[command(about = "OpenForge event platform daemon")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8450")]
    listen: String,

    /// Optional dedicated listener exposing GET /metrics.
    #[arg(long)]
    metrics_listen: Option<String>,

    #[arg(long, default_value = "./data")]
    data_dir: String,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .init();

    let gate_secret = std::env::var("OPENFORGE_GATE_SECRET")
        .map_err(|_| "OPENFORGE_GATE_SECRET must be set")?;

    let cfg = DaemonConfig::from_env();
    let services = Arc::new(Services::build(
        Path::new(&args.data_dir),
        gate_secret.into_bytes(),
        cfg,
    )?);

    if let Some(metrics_listen) = &args.metrics_listen {
        let addr: SocketAddr = metrics_listen.parse()?;
        Arc::clone(&services.telemetry)
            .spawn_metrics_server(addr)
            .await?;
        tracing::info!(%addr, "metrics server started");
    }

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!(listen = %args.listen, data_dir = %args.data_dir, "starting OpenForge daemon");

    http::serve(listener, services, shutdown_signal()).await?;

    tracing::info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(err) => tracing::error!(error = %err, "terminate handler install failed"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
