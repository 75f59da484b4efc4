//! Nutrilabel CLI - browse nutrition-label data from the terminal

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use nutrilabel_core::tracing::{InstrumentationConfig, init_tracing};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "nutrilabel")]
#[command(about = "Browse nutrition-label data for food products")]
#[command(version)]
struct Cli {
    /// Set logging level (overrides `RUST_LOG`; defaults to warn)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file (TOML)
    #[arg(short = 'c', long, global = true, env = "NUTRILABEL_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL, overrides the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = log_filter(cli.log_level, std::env::var("RUST_LOG").ok());
    let instrumentation = InstrumentationConfig::from_env().with_log_level(filter);
    init_tracing(&instrumentation)?;

    let mut config = config::load_client_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = Some(base_url);
    }
    debug!(?config, "Loaded configuration");

    if let Err(e) = cli.command.execute(config).await {
        error!("Command failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// `--log-level` wins over `RUST_LOG`, which wins over the default
fn log_filter(flag: Option<LogLevel>, rust_log: Option<String>) -> String {
    match (flag, rust_log) {
        (Some(level), _) => level.filter(),
        (None, Some(filter)) if !filter.is_empty() => filter,
        (None, _) => LogLevel::Warn.filter(),
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn filter(self) -> String {
        let level = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        format!("nutrilabel={level},nutrilabel_http={level},nutrilabel_core={level}")
    }
}
