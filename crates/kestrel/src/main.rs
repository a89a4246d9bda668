//! Kestrel - caching MCP gateway for web search, page extraction and market data.
//!
//! Main entry point: loads configuration, assembles the tool registry and
//! cache families, starts the background sweeps, and serves MCP over SSE
//! until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use kestrel_config::KestrelConfig;
use kestrel_server::{Gateway, Server, ServerConfig};
use kestrel_tools::{HttpUpstream, HttpUpstreamConfig};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Kestrel - caching MCP gateway for web search, page extraction and market data
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/kestrel/config.toml)
    #[arg(short, long, env = "KESTREL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind to (overrides config and KESTREL_BIND)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write daily-rotated JSON logs to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Validate the configuration, print the resolved settings, and exit
    #[arg(long)]
    pub check: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_deref())?;

    let loaded =
        kestrel_config::load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let mut config = loaded.config;
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("No config file found, using defaults"),
    }

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
        config.validate().context("invalid --bind")?;
    }

    for value in config.required_values().iter().filter(|v| !v.present) {
        warn!(
            name = value.name,
            "Required configuration value missing; provider calls will fail"
        );
    }

    if cli.check {
        print_summary(&config, loaded.source.as_deref());
        return Ok(());
    }

    serve(config).await
}

async fn serve(config: KestrelConfig) -> Result<()> {
    let upstream = HttpUpstream::new(HttpUpstreamConfig {
        name: config.provider.name.clone(),
        base_url: config.provider.url()?,
        api_key: config.provider.api_key.clone(),
        timeout: config.provider.timeout(),
    })
    .context("failed to build provider client")?;

    let gateway = Gateway::from_config(&config, Arc::new(upstream))
        .context("failed to register tools")?;
    let server_config = ServerConfig::from_settings(&config.server)?;

    let shutdown = CancellationToken::new();
    let sweepers = kestrel_cache::spawn_sweepers(&gateway.caches, &shutdown);
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    let server = Server::new(gateway, server_config, shutdown.clone());
    let result = server.run().await;

    shutdown.cancel();
    for sweeper in sweepers {
        let _ = sweeper.await;
    }
    info!("Shutdown complete");

    result.context("server failed")
}

async fn shutdown_on_ctrl_c(shutdown: CancellationToken) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "Unable to listen for Ctrl-C"),
        },
        _ = shutdown.cancelled() => {}
    }
}

/// Console logging, plus an optional daily-rolling JSON file.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "kestrel=debug,kestrel_server=debug,kestrel_tools=debug,kestrel_cache=debug,kestrel_config=debug,tower_http=debug,info"
    } else {
        "kestrel=info,kestrel_server=info,kestrel_tools=info,kestrel_cache=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "kestrel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(
                    "kestrel=trace,kestrel_server=trace,kestrel_tools=trace,kestrel_cache=trace,kestrel_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn print_summary(config: &KestrelConfig, source: Option<&Path>) {
    match source {
        Some(path) => println!("Configuration OK ({})", path.display()),
        None => println!("Configuration OK (defaults)"),
    }
    println!("  bind: {}", config.server.bind);
    println!(
        "  provider: {} at {} (timeout {}s)",
        config.provider.name, config.provider.base_url, config.provider.timeout_secs
    );
    for family in config.families() {
        let capacity = family
            .max_entries
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        println!(
            "  cache {}: ttl {}s, max entries {}",
            family.name, family.ttl_secs, capacity
        );
    }
    println!("  health ttl: {}s", config.health.ttl_secs);
    for value in config.required_values() {
        println!(
            "  {}: {}",
            value.name,
            if value.present { "set" } else { "missing" }
        );
    }
}
