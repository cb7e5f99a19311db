//! MGA Load Generator - Main Binary
//!
//! Drives weighted random traffic against the demo application:
//! - index, error status and response size endpoints (`demo` catalog)
//! - GET/POST `/hello` endpoints (`hello` catalog)
//! - optional Prometheus metrics endpoint
//! - JSON summary report

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mga_loadgen::{LoadgenConfig, LoadgenMetrics, Swarm};
use mga_profile::{Catalog, BUILTIN_CATALOGS};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// MGA Load Generator CLI
#[derive(Parser)]
#[command(name = "mga-loadgen")]
#[command(about = "Synthetic traffic generator for the MGA demo application")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "MGA_LOADGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Target base URL (overrides config)
    #[arg(long, env = "MGA_LOADGEN_HOST")]
    host: Option<String>,

    /// Number of concurrent users
    #[arg(short, long)]
    users: Option<usize>,

    /// Users started per second
    #[arg(short = 'r', long)]
    spawn_rate: Option<f64>,

    /// Stop after this many seconds
    #[arg(short = 't', long)]
    run_time: Option<u64>,

    /// Traffic catalog (demo, hello)
    #[arg(long)]
    catalog: Option<String>,

    /// Seed for reproducible traffic
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final statistics as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List built-in catalogs with their weights
    Catalogs,

    /// Validate configuration and print the effective values
    CheckConfig,

    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LoadgenConfig::load(path)?,
        None => LoadgenConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { config.log.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    if let Some(cmd) = &cli.command {
        match cmd {
            Command::Catalogs => return print_catalogs(),
            Command::CheckConfig => {
                config.validate()?;
                println!("{}", toml::to_string_pretty(&config)?);
                return Ok(());
            }
            Command::Version => {
                println!("mga-loadgen v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
        }
    }

    info!("Starting MGA load generator v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {:?}", path);
    }

    config.validate()?;
    let catalog = config.build_catalog()?;

    let shutdown = CancellationToken::new();
    let mut swarm = Swarm::new(config.swarm_config(), catalog)?;

    let metrics_task = if config.metrics.enabled {
        let metrics = Arc::new(LoadgenMetrics::new().context("Failed to register metrics")?);
        swarm = swarm.with_metrics(metrics.clone());
        let addr = config.metrics_addr()?;
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = mga_loadgen::metrics::serve_metrics(metrics, addr, token).await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = signal::ctrl_c() => info!("Received shutdown signal (Ctrl+C)"),
            _ = shutdown_signal() => info!("Received shutdown signal (SIGTERM)"),
        }
        signal_token.cancel();
    });

    let snapshot = swarm.run(shutdown.clone()).await?;
    shutdown.cancel();
    if let Some(task) = metrics_task {
        task.await.ok();
    }

    println!("{}", snapshot);

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Report written to {:?}", path);
    }

    Ok(())
}

fn apply_overrides(config: &mut LoadgenConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.target.host = host.clone();
    }
    if let Some(users) = cli.users {
        config.harness.users = users;
    }
    if let Some(spawn_rate) = cli.spawn_rate {
        config.harness.spawn_rate = spawn_rate;
    }
    if let Some(run_time) = cli.run_time {
        config.harness.run_time_secs = Some(run_time);
    }
    if let Some(catalog) = &cli.catalog {
        config.profile.catalog = catalog.clone();
        config.profile.actions.clear();
    }
    if let Some(seed) = cli.seed {
        config.session.seed = Some(seed);
    }
}

fn print_catalogs() -> Result<()> {
    for name in BUILTIN_CATALOGS {
        let catalog = Catalog::builtin(name)?;
        let baseline = catalog.baseline();
        println!(
            "{} (baseline: {} {} {})",
            catalog.name(),
            baseline.name,
            baseline.method,
            baseline.path
        );

        for entry in catalog.actions().iter() {
            let probability = catalog
                .actions()
                .probability(&entry.action.name)
                .unwrap_or_default();
            println!(
                "  {:<14} {:<6} {:<26} weight {:>2}  p={:.3}",
                entry.action.name,
                entry.action.method,
                entry.action.path,
                entry.weight,
                probability
            );
        }
    }
    Ok(())
}

/// Cross-platform shutdown signal handling
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    // On non-Unix systems, only Ctrl+C is supported
    std::future::pending::<()>().await
}
