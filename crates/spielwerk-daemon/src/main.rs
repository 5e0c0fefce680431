// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spielwerk: an IPP print server whose printers play audio.
//
// Entry point.  Initialises logging, loads the configuration named on the
// command line (or the defaults), starts every printer and the IPP listener,
// and shuts both down on Ctrl-C.
//
//   spielwerk [CONFIG.json]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use spielwerk_core::config::ServerConfig;
use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_server::{IppServer, PrintService};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Spielwerk starting");

    match run(std::env::args_os().nth(1).map(PathBuf::from)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Spielwerk stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// The configuration at `path`, or the validated defaults.
fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ServerConfig::load(&path)
        }
        None => {
            info!("no configuration file given, using defaults");
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let service = Arc::new(PrintService::from_config(&config)?);
    service.start()?;

    let mut server = IppServer::new(Arc::clone(&service), &config);
    let served = match server.start().await {
        Ok(addr) => {
            info!(
                %addr,
                printers = config.printers.len(),
                default_printer = %config.default_printer,
                "Spielwerk ready"
            );
            wait_for_shutdown().await
        }
        Err(e) => Err(e),
    };

    let stopped = server.stop().await;
    let printers = Arc::clone(&service);
    tokio::task::spawn_blocking(move || printers.stop())
        .await
        .map_err(|e| SpielwerkError::PrintServer(format!("printer shutdown: {e}")))?;
    info!("Spielwerk stopped");

    served.and(stopped)
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    Ok(())
}
