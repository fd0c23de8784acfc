// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! plansyncd - The plansync daemon.
//!
//! Keeps the entity table of every configured connection in sync with the
//! remote charge plans, and optionally serves the local subscriber API.
//!
//! Usage:
//!   plansyncd [--config <path>] [--verbose] [--log-file <path>] [--once]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use plansync::{server, Config, Coordinator, EventHub, HttpApi, Registry};

/// plansyncd: repeating charge plan synchronizer
#[derive(Parser, Debug)]
#[command(name = "plansyncd", version)]
#[command(about = "Keeps local plan entities in sync with remote charge-control services")]
struct Args {
    /// Config file (default: ~/.config/plansync/config.toml)
    #[arg(short, long, env = "PLANSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Fetch and reconcile every connection once, print the entities, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(args.verbose, args.log_file.as_deref());

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "plansyncd starting, config={}, {} connection(s)",
        config_path.display(),
        config.connections.len()
    );

    let result = if args.once {
        run_once(&config).await
    } else {
        run(&config).await
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Runs until interrupted.
async fn run(config: &Config) -> plansync::Result<()> {
    let registry = Arc::new(Registry::setup(config).await?);
    let shutdown = CancellationToken::new();

    let server = if config.server.enabled {
        let listener = server::bind(config.server.bind).await?;
        Some(tokio::spawn(server::serve(
            listener,
            Arc::clone(&registry),
            shutdown.clone(),
        )))
    } else {
        None
    };

    // Signal readiness to a supervising process
    println!("READY");
    let _ = std::io::stdout().flush();

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to wait for interrupt: {}", e);
    }
    info!("shutting down");

    shutdown.cancel();
    if let Some(server) = server {
        match server.await {
            Ok(Err(e)) => warn!("local API failed: {}", e),
            Err(e) => warn!("local API task ended abnormally: {}", e),
            Ok(Ok(())) => {}
        }
    }
    let report = registry.teardown_all().await;
    info!("plansyncd stopped: {}", report);
    Ok(())
}

/// Reconciles each connection once and prints every rendered entity as JSON.
async fn run_once(config: &Config) -> plansync::Result<()> {
    let events = EventHub::new();
    let mut rendered = serde_json::Map::new();
    for conn in &config.connections {
        let api = HttpApi::from_config(conn)?;
        let coordinator = Coordinator::with_options(
            conn.name(),
            Arc::new(api),
            events.clone(),
            conn.vehicles,
            conn.stale_after(),
        );
        let report = coordinator.refresh().await?;
        info!("[{}] {}", coordinator.name(), report);
        rendered.insert(
            coordinator.name().to_string(),
            serde_json::Value::from(coordinator.entities().await),
        );
    }

    let out = serde_json::to_string_pretty(&rendered).map_err(ps_core::Error::from)?;
    println!("{}", out);
    Ok(())
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Try to open the log file, fall back to stderr
    let file = log_file.and_then(|path| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
