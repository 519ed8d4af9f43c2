//! Monitoring configuration

use crate::alerting::AlertConfig;
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for a single reachability probe
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Enable metrics collection
    pub enabled: bool,
    /// Users who logged in within this many days count as active
    pub activity_window_days: u32,
    /// Timeout applied to each reachability probe, in milliseconds
    pub probe_timeout_ms: u64,
    /// Capacity of each rolling duration sample
    pub sample_capacity: usize,
    /// Cache expiration policies
    pub cache: CacheConfig,
    /// Threshold rules
    pub alerting: AlertConfig,
    /// Exposition settings
    pub exporter: ExporterConfig,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activity_window_days: 7,
            probe_timeout_ms: 2000,
            sample_capacity: 1000,
            cache: CacheConfig::default(),
            alerting: AlertConfig::default(),
            exporter: ExporterConfig::default(),
        }
    }
}

impl MonitoringConfig {
    /// Probe timeout, capped at [`MAX_PROBE_TIMEOUT`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms).min(MAX_PROBE_TIMEOUT)
    }

    /// Activity window as a chrono duration
    pub fn activity_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.activity_window_days))
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(MonitorError::config("probe_timeout_ms must be positive"));
        }
        if Duration::from_millis(self.probe_timeout_ms) > MAX_PROBE_TIMEOUT {
            return Err(MonitorError::config(format!(
                "probe_timeout_ms must not exceed {} ms",
                MAX_PROBE_TIMEOUT.as_millis()
            )));
        }
        if self.sample_capacity == 0 {
            return Err(MonitorError::config("sample_capacity must be positive"));
        }
        if self.activity_window_days == 0 {
            return Err(MonitorError::config("activity_window_days must be positive"));
        }
        self.cache.validate()?;
        self.alerting.validate()
    }
}

/// Recognized cache classes, each with its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheClass {
    /// Overview and per-model metrics
    Metrics,
    /// Daily statistics
    Stats,
    /// Reachability probe results
    Health,
}

impl CacheClass {
    /// Key prefix used for entries of this class
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheClass::Metrics => "metrics",
            CacheClass::Stats => "stats",
            CacheClass::Health => "health",
        }
    }
}

/// Cache expiration policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub metrics_ttl_secs: u64,
    pub stats_ttl_secs: u64,
    pub health_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metrics_ttl_secs: 300,
            stats_ttl_secs: 3600,
            health_ttl_secs: 60,
        }
    }
}

impl CacheConfig {
    /// TTL for a cache class
    pub fn ttl(&self, class: CacheClass) -> Duration {
        let secs = match class {
            CacheClass::Metrics => self.metrics_ttl_secs,
            CacheClass::Stats => self.stats_ttl_secs,
            CacheClass::Health => self.health_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    fn validate(&self) -> Result<()> {
        for class in [CacheClass::Metrics, CacheClass::Stats, CacheClass::Health] {
            if self.ttl(class).is_zero() {
                return Err(MonitorError::config(format!(
                    "{}_ttl_secs must be positive",
                    class.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Exposition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Interval the external scraper is expected to pull at
    pub scrape_interval_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            scrape_interval_secs: 30,
        }
    }
}
