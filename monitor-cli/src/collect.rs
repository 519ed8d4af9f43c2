//! One-shot metric collection

use crate::CliError;
use crate::cli::CollectArgs;
use chrono::{Duration, NaiveDate, Utc};
use libris_monitor_core::{MonitoredModel, SystemHealthReporter};
use std::io::Write;
use tracing::{info, warn};

/// What a `collect` run does; the first matching flag wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectMode {
    HealthCheck,
    DailyStats(NaiveDate),
    Alerts,
    All { force: bool },
}

impl CollectMode {
    pub fn from_args(args: &CollectArgs) -> Self {
        if args.health_check {
            Self::HealthCheck
        } else if args.daily_stats {
            Self::DailyStats(
                args.date
                    .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1)),
            )
        } else if args.alerts {
            Self::Alerts
        } else {
            Self::All { force: args.force }
        }
    }
}

/// Run one collection and print the result to `out`
///
/// Returns `false` when the run should end with a non-zero exit code: an
/// unhealthy health check, or a full collection with failed sections or
/// model reports.
pub async fn run<W: Write>(
    reporter: &SystemHealthReporter,
    mode: CollectMode,
    out: &mut W,
) -> Result<bool, CliError> {
    info!("Starting metric collection: {:?}", mode);
    let ok = match mode {
        CollectMode::HealthCheck => health_check(reporter, out).await?,
        CollectMode::DailyStats(date) => daily_stats(reporter, date, out).await?,
        CollectMode::Alerts => alerts(reporter, out).await?,
        CollectMode::All { force } => collect_all(reporter, force, out).await?,
    };
    info!("Metric collection finished");
    Ok(ok)
}

async fn collect_all<W: Write>(
    reporter: &SystemHealthReporter,
    force: bool,
    out: &mut W,
) -> Result<bool, CliError> {
    writeln!(out, "Collecting metrics...")?;
    if force {
        reporter.refresh().await;
    }

    let overview = reporter.overview().await;
    writeln!(
        out,
        "users: {} total, {} active ({:.2}%) [{}]",
        overview.users.total,
        overview.users.active,
        overview.users.activity_rate,
        overview.users.status
    )?;
    writeln!(
        out,
        "books: {} total, {} available ({:.2}%) [{}]",
        overview.books.total,
        overview.books.available,
        overview.books.availability_rate,
        overview.books.status
    )?;
    writeln!(
        out,
        "loans: {} active, {} overdue ({:.2}%) [{}]",
        overview.loans.active,
        overview.loans.overdue,
        overview.loans.overdue_rate,
        overview.loans.status
    )?;
    writeln!(
        out,
        "performance: {} requests, {:.2}% errors",
        overview.performance.requests_total, overview.performance.error_rate
    )?;

    let mut ok = overview.failed_sections.is_empty();
    for model in MonitoredModel::ALL {
        match reporter.model_report(model).await {
            Ok(report) => writeln!(out, "model {model}: {}", report.health().status)?,
            Err(e) => {
                warn!("Model report for {} failed: {}", model, e);
                writeln!(out, "model {model}: failed ({e})")?;
                ok = false;
            }
        }
    }

    writeln!(
        out,
        "Metrics collected at {}",
        overview.computed_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    Ok(ok)
}

async fn health_check<W: Write>(
    reporter: &SystemHealthReporter,
    out: &mut W,
) -> Result<bool, CliError> {
    writeln!(out, "Checking system health...")?;
    let snapshot = reporter.snapshot().await;

    for (probe, passed) in &snapshot.probes {
        writeln!(out, "  {probe}: {}", if *passed { "ok" } else { "failed" })?;
    }

    if snapshot.overall_healthy {
        writeln!(out, "System healthy ({})", snapshot.system_status)?;
    } else {
        writeln!(out, "System problems detected ({})", snapshot.system_status)?;
        for alert in &snapshot.alerts {
            writeln!(out, "  - [{}] {}", alert.severity, alert.message)?;
        }
    }
    Ok(snapshot.overall_healthy)
}

async fn daily_stats<W: Write>(
    reporter: &SystemHealthReporter,
    date: NaiveDate,
    out: &mut W,
) -> Result<bool, CliError> {
    writeln!(out, "Computing daily statistics for {date}...")?;
    let stats = reporter.daily_statistics(date).await?;
    for (label, value) in stats.summary_lines() {
        writeln!(out, "  {label}: {value}")?;
    }
    Ok(true)
}

async fn alerts<W: Write>(reporter: &SystemHealthReporter, out: &mut W) -> Result<bool, CliError> {
    writeln!(out, "Checking alerts...")?;
    let snapshot = reporter.snapshot().await;

    if snapshot.alerts.is_empty() {
        writeln!(out, "No active alerts")?;
    } else {
        writeln!(out, "{} alert(s) found:", snapshot.alerts.len())?;
        for (i, alert) in snapshot.alerts.iter().enumerate() {
            writeln!(out, "  {}. [{}] {}", i + 1, alert.severity, alert.message)?;
        }
    }
    Ok(true)
}
