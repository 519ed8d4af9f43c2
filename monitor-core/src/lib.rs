//! Monitoring, aggregation and alerting for the library system
//!
//! This crate provides the monitoring core behind the library API:
//! - Event counters and request duration samples ([`MetricCollector`])
//! - Aggregates derived from library data ([`AggregateComputer`])
//! - A TTL cache with single-flight recomputation ([`CacheLayer`])
//! - Threshold alerting with a fixed priority order ([`AlertEvaluator`])
//! - Health snapshots combining all of the above ([`SystemHealthReporter`])
//! - Prometheus text exposition ([`MetricsExporter`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use libris_monitor_core::{
//!     AggregateComputer, InMemoryLibrary, MetricCollector, MonitoringConfig,
//!     SystemHealthReporter,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitoringConfig::default();
//!     let collector = Arc::new(MetricCollector::new(&config)?);
//!     let library = Arc::new(InMemoryLibrary::from_json_file("library.json").await?);
//!
//!     let computer = Arc::new(AggregateComputer::new(library, collector, &config));
//!     // without probes named DATABASE_PROBE and CACHE_PROBE the system reports down
//!     let reporter = SystemHealthReporter::new(computer, &config)?;
//!
//!     let snapshot = reporter.snapshot().await;
//!     println!("healthy: {}", snapshot.overall_healthy);
//!     for alert in &snapshot.alerts {
//!         println!("{}", alert.message);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod alerting;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod exporter;
pub mod health;
pub mod metrics;
pub mod models;
pub mod source;
pub mod statistics;

pub use aggregate::AggregateComputer;
pub use alerting::{
    Alert, AlertConfig, AlertEvaluator, AlertSeverity, ComparisonOperator, RuleCategory,
    ThresholdRule,
};
pub use cache::{CacheLayer, EntryInfo};
pub use collector::{API_REQUEST_SAMPLE, DurationStats, MetricCollector};
pub use config::{CacheClass, CacheConfig, ExporterConfig, MonitoringConfig};
pub use error::{MonitorError, Result, SourceError};
pub use exporter::MetricsExporter;
pub use health::{
    CACHE_PROBE, DATABASE_PROBE, HealthSnapshot, ProbeResults, REQUIRED_PROBES, ReachabilityProbe,
    SystemHealthReporter, SystemInfo, SystemStatus,
};
pub use metrics::{PublicSummary, Section, SectionStatus, SystemOverview};
pub use models::{ModelMonitor, ModelReport, MonitoredModel};
pub use source::{InMemoryLibrary, LibraryData, LibraryDataSource};
pub use statistics::DailyStatistics;

/// Default monitoring configuration
pub fn default_config() -> MonitoringConfig {
    MonitoringConfig::default()
}

#[cfg(test)]
mod aggregate_tests;
#[cfg(test)]
mod test_support;
