//! System health reporting
//!
//! [`SystemHealthReporter`] composes a [`HealthSnapshot`] from the cached
//! overview, a fresh alert evaluation and cached reachability probes.

use crate::aggregate::AggregateComputer;
use crate::alerting::{Alert, AlertEvaluator, AlertSeverity};
use crate::cache::CacheLayer;
use crate::config::{CacheClass, CacheConfig, MonitoringConfig};
use crate::error::Result;
use crate::metrics::{PublicSummary, Section, SectionStatus, SystemOverview};
use crate::models::{ModelReport, MonitoredModel};
use crate::statistics::DailyStatistics;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const OVERVIEW_KEY: &str = "overview";
const PROBES_KEY: &str = "probes";

/// Probe name of the library data store
pub const DATABASE_PROBE: &str = "database";
/// Probe name of the cache backend
pub const CACHE_PROBE: &str = "cache";

/// Probes whose results decide system status
pub const REQUIRED_PROBES: [&str; 2] = [DATABASE_PROBE, CACHE_PROBE];

/// A dependency whose reachability is part of system health
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Name reported in the snapshot, e.g. `database`
    fn name(&self) -> &str;

    async fn check(&self) -> Result<()>;
}

/// Overall system state derived from probe results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Down,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        };
        f.write_str(s)
    }
}

/// Outcome of one round of reachability probes
///
/// Only [`REQUIRED_PROBES`] decide the status. A required probe that was
/// never registered counts as failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResults {
    /// Pass or fail per probe name, required probes always present
    pub results: BTreeMap<String, bool>,
    /// When the round ran
    pub checked_at: DateTime<Utc>,
}

impl ProbeResults {
    /// Result of the probe called `name`; missing means failed
    pub fn passed(&self, name: &str) -> bool {
        self.results.get(name).copied().unwrap_or(false)
    }

    /// Whether the database and cache probes both passed
    pub fn all_passed(&self) -> bool {
        REQUIRED_PROBES.iter().all(|name| self.passed(name))
    }

    /// Healthy when every required probe passed, down when none did
    pub fn system_status(&self) -> SystemStatus {
        let passed = REQUIRED_PROBES
            .iter()
            .filter(|name| self.passed(name))
            .count();
        if passed == REQUIRED_PROBES.len() {
            SystemStatus::Healthy
        } else if passed == 0 {
            SystemStatus::Down
        } else {
            SystemStatus::Degraded
        }
    }

    fn any_failed(&self) -> bool {
        self.results.values().any(|ok| !ok)
    }
}

/// Static facts about the running service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub version: String,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub scrape_interval_secs: u64,
}

/// Point-in-time system health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overview: SystemOverview,
    pub alerts: Vec<Alert>,
    pub probes: BTreeMap<String, bool>,
    pub overall_healthy: bool,
    pub system_status: SystemStatus,
    pub system_info: SystemInfo,
    pub recommendations: Vec<String>,
}

/// Builds health snapshots, model reports and daily statistics
pub struct SystemHealthReporter {
    computer: Arc<AggregateComputer>,
    evaluator: AlertEvaluator,
    probes: Vec<Arc<dyn ReachabilityProbe>>,
    overview_cache: CacheLayer<SystemOverview>,
    model_cache: CacheLayer<ModelReport>,
    stats_cache: CacheLayer<DailyStatistics>,
    probe_cache: CacheLayer<ProbeResults>,
    ttls: CacheConfig,
    probe_timeout: Duration,
    scrape_interval_secs: u64,
    version: String,
    environment: String,
}

impl SystemHealthReporter {
    pub fn new(computer: Arc<AggregateComputer>, config: &MonitoringConfig) -> Result<Self> {
        config.validate()?;
        let collector = computer.collector().clone();

        Ok(Self {
            evaluator: AlertEvaluator::new(&config.alerting)?,
            probes: Vec::new(),
            overview_cache: CacheLayer::new("overview").with_collector(collector.clone()),
            model_cache: CacheLayer::new("model_reports").with_collector(collector.clone()),
            stats_cache: CacheLayer::new("daily_stats").with_collector(collector.clone()),
            probe_cache: CacheLayer::new("health_probes").with_collector(collector),
            ttls: config.cache.clone(),
            probe_timeout: config.probe_timeout(),
            scrape_interval_secs: config.exporter.scrape_interval_secs,
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            computer,
        })
    }

    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn computer(&self) -> &Arc<AggregateComputer> {
        &self.computer
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// System overview, served from cache within the metrics TTL
    ///
    /// An overview with failed sections is returned but not stored, so the
    /// next request after the source recovers sees fresh figures.
    pub async fn overview(&self) -> SystemOverview {
        self.overview_cache
            .get_or_compute(OVERVIEW_KEY, self.ttls.ttl(CacheClass::Metrics), || async {
                let overview = self.computer.compute_system_overview().await;
                if overview.failed_sections.is_empty() {
                    Ok(overview)
                } else {
                    Err(overview)
                }
            })
            .await
            .unwrap_or_else(|partial| partial)
    }

    /// Run every probe, served from cache within the health TTL
    ///
    /// A round with a failed probe is not stored.
    pub async fn probe_all(&self) -> ProbeResults {
        self.probe_cache
            .get_or_compute(PROBES_KEY, self.ttls.ttl(CacheClass::Health), || async {
                let results = self.run_probes().await;
                if results.any_failed() {
                    Err(results)
                } else {
                    Ok(results)
                }
            })
            .await
            .unwrap_or_else(|failed| failed)
    }

    async fn run_probes(&self) -> ProbeResults {
        let timeout = self.probe_timeout;
        let outcomes = join_all(self.probes.iter().map(|probe| async move {
            let ok = match tokio::time::timeout(timeout, probe.check()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!(probe = probe.name(), error = %e, "Reachability probe failed");
                    false
                }
                Err(_) => {
                    warn!(
                        probe = probe.name(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Reachability probe timed out"
                    );
                    false
                }
            };
            (probe.name().to_string(), ok)
        }))
        .await;

        let mut results: BTreeMap<String, bool> = outcomes.into_iter().collect();
        for name in REQUIRED_PROBES {
            results.entry(name.to_string()).or_insert_with(|| {
                warn!(probe = name, "Required probe is not registered");
                false
            });
        }

        ProbeResults {
            results,
            checked_at: Utc::now(),
        }
    }

    /// Compose a full health snapshot
    pub async fn snapshot(&self) -> HealthSnapshot {
        let (mut overview, probes) = tokio::join!(self.overview(), self.probe_all());
        let alerts = self.evaluator.evaluate(&overview.alert_inputs());

        for section in [
            Section::Users,
            Section::Books,
            Section::Loans,
            Section::Performance,
        ] {
            let status = section_status(overview.section_status(section), section, &alerts);
            overview.set_section_status(section, status);
        }

        let has_critical = alerts
            .iter()
            .any(|a| a.severity == AlertSeverity::Critical);
        let overall_healthy = probes.all_passed() && !has_critical;

        let recommendations = alerts.iter().map(|a| self.recommendation(a)).collect();
        let collector = self.computer.collector();

        if !overall_healthy {
            info!(
                alerts = alerts.len(),
                status = ?probes.system_status(),
                "System reported unhealthy"
            );
        }

        HealthSnapshot {
            timestamp: Utc::now(),
            overview,
            alerts,
            system_status: probes.system_status(),
            probes: probes.results,
            overall_healthy,
            system_info: SystemInfo {
                version: self.version.clone(),
                environment: self.environment.clone(),
                started_at: collector.started_at(),
                uptime_seconds: collector.uptime().as_secs(),
                scrape_interval_secs: self.scrape_interval_secs,
            },
            recommendations,
        }
    }

    fn recommendation(&self, alert: &Alert) -> String {
        self.evaluator
            .rules()
            .iter()
            .find(|rule| rule.name == alert.rule)
            .map(|rule| rule.description.clone())
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| alert.message.clone())
    }

    /// Report of one model, served from cache within the metrics TTL
    pub async fn model_report(&self, model: MonitoredModel) -> Result<ModelReport> {
        self.model_cache
            .get_or_compute(model.as_str(), self.ttls.ttl(CacheClass::Metrics), || {
                self.computer.compute_model_metrics(model)
            })
            .await
    }

    /// Report of a model given by name
    pub async fn model_report_by_name(&self, name: &str) -> Result<ModelReport> {
        let model: MonitoredModel = name.parse()?;
        self.model_report(model).await
    }

    /// Statistics of one day, served from cache within the stats TTL
    pub async fn daily_statistics(&self, date: NaiveDate) -> Result<DailyStatistics> {
        let key = date.to_string();
        let ttl = self.ttls.ttl(CacheClass::Stats);
        self.stats_cache.purge_expired(ttl).await;
        self.stats_cache
            .get_or_compute(&key, ttl, || {
                self.computer.compute_daily_statistics(date)
            })
            .await
    }

    /// Totals safe to show without authentication
    pub async fn public_summary(&self) -> PublicSummary {
        PublicSummary::from(&self.overview().await)
    }

    /// Drop every cached aggregate and probe result
    pub async fn refresh(&self) {
        tokio::join!(
            self.overview_cache.clear(),
            self.model_cache.clear(),
            self.stats_cache.clear(),
            self.probe_cache.clear(),
        );
        info!("Monitoring caches cleared");
    }

    /// When the cached overview was computed, if one is cached
    pub async fn overview_computed_at(&self) -> Option<DateTime<Utc>> {
        self.overview_cache
            .entry_info(OVERVIEW_KEY)
            .await
            .map(|info| info.computed_at)
    }
}

/// Status of a section given the alerts of this evaluation
fn section_status(current: SectionStatus, section: Section, alerts: &[Alert]) -> SectionStatus {
    if current == SectionStatus::Unknown {
        return SectionStatus::Unknown;
    }

    alerts
        .iter()
        .filter(|a| a.section == section)
        .map(|a| match a.severity {
            AlertSeverity::Critical => SectionStatus::Critical,
            AlertSeverity::Warning => SectionStatus::Warning,
            AlertSeverity::Info => SectionStatus::Healthy,
        })
        .max()
        .unwrap_or(SectionStatus::Healthy)
}

impl std::fmt::Debug for SystemHealthReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemHealthReporter")
            .field("probes", &self.probes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("probe_timeout", &self.probe_timeout)
            .field("environment", &self.environment)
            .finish()
    }
}
