//! Command-line arguments

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Library monitoring operations
#[derive(Debug, Parser)]
#[command(name = "libris-monitor", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "LIBRIS_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitoring API
    Serve(ServeArgs),
    /// Collect metrics once and print the result
    Collect(CollectArgs),
    /// Exercise a running deployment over HTTP
    SelfTest(SelfTestArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen address, overrides `server.bind`
    #[arg(long)]
    pub bind: Option<String>,

    /// Library data file, overrides `data.path`
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CollectArgs {
    /// Discard cached aggregates before collecting
    #[arg(long)]
    pub force: bool,

    /// Compute statistics for one day
    #[arg(long)]
    pub daily_stats: bool,

    /// Day for `--daily-stats` (YYYY-MM-DD), defaults to yesterday
    #[arg(long, requires = "daily_stats")]
    pub date: Option<NaiveDate>,

    /// Check system health; exits non-zero when unhealthy
    #[arg(long)]
    pub health_check: bool,

    /// List active alerts
    #[arg(long)]
    pub alerts: bool,

    /// Library data file, overrides `data.path`
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SelfTestArgs {
    /// Base URL of the running monitoring API
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub url: String,

    /// Administrator API key
    #[arg(long, env = "LIBRIS_MONITOR_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Check the admin monitoring endpoints
    #[arg(long)]
    pub endpoints: bool,

    /// Check the Prometheus endpoint
    #[arg(long)]
    pub metrics: bool,

    /// Check alert evaluation
    #[arg(long)]
    pub alerts: bool,

    /// Measure endpoint response times
    #[arg(long)]
    pub performance: bool,

    /// Run every check
    #[arg(long)]
    pub all: bool,
}
