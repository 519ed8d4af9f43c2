//! Configuration loading and logging setup

use crate::CliError;
use libris_monitor_core::MonitoringConfig;
use libris_monitor_server::{AuthConfig, ServerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultLoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "compact")]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[serde(rename = "stderr")]
    Stderr,
}

impl Default for DefaultLoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

impl DefaultLoggingConfig {
    /// Install the global subscriber; `RUST_LOG` overrides `level`
    pub fn initialize(&self) -> Result<(), CliError> {
        use tracing_subscriber::{EnvFilter, prelude::*};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| CliError::logging(format!("Invalid log level: {e}")))?;

        tracing_subscriber::registry()
            .with(self.fmt_layer())
            .with(filter)
            .try_init()
            .map_err(|e| CliError::logging(e.to_string()))
    }

    fn fmt_layer<S>(&self) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        use tracing_subscriber::{Layer, fmt};

        match (&self.format, &self.output) {
            (LogFormat::Json, LogOutput::Stdout) => fmt::layer().json().boxed(),
            (LogFormat::Json, LogOutput::Stderr) => {
                fmt::layer().json().with_writer(std::io::stderr).boxed()
            }
            (LogFormat::Pretty, LogOutput::Stdout) => fmt::layer().pretty().boxed(),
            (LogFormat::Pretty, LogOutput::Stderr) => {
                fmt::layer().pretty().with_writer(std::io::stderr).boxed()
            }
            (LogFormat::Compact, LogOutput::Stdout) => fmt::layer().compact().boxed(),
            (LogFormat::Compact, LogOutput::Stderr) => {
                fmt::layer().compact().with_writer(std::io::stderr).boxed()
            }
        }
    }
}

/// Location of the library data file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("library.json"),
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: DefaultLoggingConfig,
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    pub auth: AuthConfig,
    pub data: DataConfig,
}

impl AppConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, CliError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), CliError> {
        self.monitoring.validate()?;

        if self.server.bind.trim().is_empty() {
            return Err(CliError::configuration("server.bind must not be empty"));
        }
        if self.auth.admin_roles.is_empty() {
            return Err(CliError::configuration(
                "auth.admin_roles must name at least one role",
            ));
        }
        if let Some(entry) = self.auth.api_keys.iter().find(|e| e.key.trim().is_empty()) {
            return Err(CliError::configuration(format!(
                "auth.api_keys entry for '{}' has an empty key",
                entry.user
            )));
        }
        Ok(())
    }
}
