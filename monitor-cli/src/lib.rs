//! Operational CLI for the library monitoring system
//!
//! The `libris-monitor` binary has three subcommands:
//! - `serve` runs the monitoring API
//! - `collect` runs the monitoring core once against the configured data
//!   and prints the result, exiting non-zero when a health check fails
//! - `self-test` exercises a live deployment over HTTP
//!
//! Configuration is read from a TOML file (see [`AppConfig`]); logging is
//! initialized from its `[logging]` section with `RUST_LOG` taking
//! precedence.

use thiserror::Error;

pub mod cli;
pub mod collect;
pub mod commands;
pub mod config;
pub mod selftest;

pub use cli::{Cli, Command};
pub use config::{AppConfig, DataConfig, DefaultLoggingConfig, LogFormat, LogOutput};

/// Error types for CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Server setup error: {0}")]
    ServerSetup(String),

    #[error("Self-test error: {0}")]
    SelfTest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Monitor(#[from] libris_monitor_core::MonitorError),
}

impl CliError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    pub fn self_test(msg: impl Into<String>) -> Self {
        Self::SelfTest(msg.into())
    }
}

impl From<libris_monitor_server::ServerError> for CliError {
    fn from(err: libris_monitor_server::ServerError) -> Self {
        Self::ServerSetup(err.to_string())
    }
}

#[cfg(test)]
mod cli_tests;
#[cfg(test)]
mod config_tests;
