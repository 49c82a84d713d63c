//! quotecache CLI - main entry point

mod simulate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quotecache_foundation::CacheConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use simulate::SimulateOptions;

/// Default config file, relative to the user's config directory
const CONFIG_FILE: &str = "quotecache/config.toml";

/// quotecache - memoization cache for market data lookups
#[derive(Parser, Debug)]
#[command(name = "quotecache")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration (file + environment) as JSON
    Config,
    /// Drive a simulated upstream through the memoizer and report
    Simulate {
        /// Comma-separated symbols to look up each round
        #[arg(long, value_delimiter = ',', default_value = "MSFT,AAPL")]
        symbols: Vec<String>,

        /// Number of lookup rounds
        #[arg(long, default_value = "5")]
        rounds: usize,

        /// Simulated upstream latency per call
        #[arg(long, default_value = "50")]
        latency_ms: u64,

        /// Pause between rounds
        #[arg(long, default_value = "200")]
        pause_ms: u64,

        /// Override the configured freshness window
        #[arg(long)]
        freshness_secs: Option<u64>,

        /// Override the configured sweep interval (milliseconds)
        #[arg(long)]
        sweep_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Simulate {
            symbols,
            rounds,
            latency_ms,
            pause_ms,
            freshness_secs,
            sweep_ms,
        } => {
            if let Some(secs) = freshness_secs {
                config.freshness_secs = secs;
                config.validate()?;
            }
            let options = SimulateOptions {
                symbols,
                rounds,
                latency: Duration::from_millis(latency_ms),
                pause: Duration::from_millis(pause_ms),
                sweep_interval: sweep_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config.sweep_interval()),
            };

            let report = tokio::select! {
                report = simulate::run(config, options) => report?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted");
                    return Ok(());
                }
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Explicit file, else the default file if present, else defaults; env on top
fn load_config(path: Option<&Path>) -> anyhow::Result<CacheConfig> {
    let default_path = dirs::config_dir().map(|dir| dir.join(CONFIG_FILE));

    let mut config = match (path, default_path) {
        (Some(path), _) => CacheConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        (None, Some(path)) if path.exists() => {
            tracing::debug!("Using config file {}", path.display());
            CacheConfig::load(&path)?
        }
        _ => CacheConfig::default(),
    };

    config
        .apply_env_overrides()
        .context("applying QUOTECACHE_* environment overrides")?;
    Ok(config)
}
