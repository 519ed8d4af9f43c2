//! Aggregate computation over the library data source
//!
//! The computer combines data source statistics with the collector's
//! counters and duration samples. Sections of the system overview are
//! computed concurrently and independently: a failing section is reported
//! as `unknown` instead of failing the whole overview.

use crate::collector::{API_REQUEST_SAMPLE, MetricCollector};
use crate::config::MonitoringConfig;
use crate::error::{MonitorError, Result};
use crate::metrics::{
    BookSummary, LoanSummary, PerformanceSummary, Section, SectionStatus, SystemOverview,
    UserSummary, round2,
};
use crate::models::{ModelMonitor, ModelReport, MonitoredModel, ReportContext, default_monitors};
use crate::source::LibraryDataSource;
use crate::statistics::DailyStatistics;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum sample count before a p95 is reported
const MIN_SAMPLES_FOR_P95: usize = 20;

/// Computes overviews, model reports and daily statistics
pub struct AggregateComputer {
    source: Arc<dyn LibraryDataSource>,
    collector: Arc<MetricCollector>,
    monitors: HashMap<MonitoredModel, Box<dyn ModelMonitor>>,
    activity_window: Duration,
}

impl AggregateComputer {
    /// Create a computer with the monitors of every [`MonitoredModel`]
    pub fn new(
        source: Arc<dyn LibraryDataSource>,
        collector: Arc<MetricCollector>,
        config: &MonitoringConfig,
    ) -> Self {
        let monitors = default_monitors()
            .into_iter()
            .map(|monitor| (monitor.model(), monitor))
            .collect();

        Self {
            source,
            collector,
            monitors,
            activity_window: config.activity_window(),
        }
    }

    /// Replace the monitor registered for its model
    pub fn with_monitor(mut self, monitor: Box<dyn ModelMonitor>) -> Self {
        self.monitors.insert(monitor.model(), monitor);
        self
    }

    pub fn source(&self) -> &Arc<dyn LibraryDataSource> {
        &self.source
    }

    pub fn collector(&self) -> &Arc<MetricCollector> {
        &self.collector
    }

    /// Compute the system overview; never fails
    pub async fn compute_system_overview(&self) -> SystemOverview {
        let now = Utc::now();
        let today = now.date_naive();
        let since = now - self.activity_window;

        let (users, books, loans) = tokio::join!(
            self.source.user_stats(since),
            self.source.book_stats(0),
            self.source.loan_stats(today),
        );

        let mut failed_sections = Vec::new();

        let users = match users {
            Ok(stats) => UserSummary::new(stats.total, stats.recent_logins),
            Err(e) => {
                warn!(section = "users", error = %e, "Section computation failed");
                failed_sections.push(Section::Users);
                UserSummary::unavailable()
            }
        };
        let books = match books {
            Ok(stats) => BookSummary::new(stats.total, stats.available),
            Err(e) => {
                warn!(section = "books", error = %e, "Section computation failed");
                failed_sections.push(Section::Books);
                BookSummary::unavailable()
            }
        };
        let loans = match loans {
            Ok(stats) => LoanSummary::new(stats.active, stats.overdue),
            Err(e) => {
                warn!(section = "loans", error = %e, "Section computation failed");
                failed_sections.push(Section::Loans);
                LoanSummary::unavailable()
            }
        };

        let overview = SystemOverview {
            computed_at: now,
            users,
            books,
            loans,
            performance: self.performance_summary(),
            failed_sections,
        };
        debug!(
            users = overview.users.total,
            books = overview.books.total,
            active_loans = overview.loans.active,
            "Computed system overview"
        );
        overview
    }

    fn performance_summary(&self) -> PerformanceSummary {
        let stats = self.collector.duration_stats(API_REQUEST_SAMPLE);

        PerformanceSummary {
            requests_total: self.collector.api_requests(),
            error_rate: round2(self.collector.error_rate_percent()),
            avg_response_time_ms: stats.as_ref().map(|s| round2(s.avg_ms)),
            p95_response_time_ms: stats
                .as_ref()
                .filter(|s| s.count >= MIN_SAMPLES_FOR_P95)
                .map(|s| round2(s.p95_ms)),
            status: SectionStatus::Healthy,
        }
    }

    /// Compute the report of one model
    pub async fn compute_model_metrics(&self, model: MonitoredModel) -> Result<ModelReport> {
        let monitor = self
            .monitors
            .get(&model)
            .ok_or_else(|| MonitorError::UnknownModel(model.to_string()))?;

        let ctx = ReportContext {
            now: Utc::now(),
            activity_window: self.activity_window,
        };
        monitor.report(self.source.as_ref(), &ctx).await
    }

    /// Compute statistics for one calendar day
    pub async fn compute_daily_statistics(&self, date: NaiveDate) -> Result<DailyStatistics> {
        let day_start = date.and_time(NaiveTime::MIN).and_utc();

        let (users, books, loans, activity) = tokio::join!(
            self.source.user_stats(day_start),
            self.source.book_stats(0),
            self.source.loan_stats(date),
            self.source.daily_activity(date),
        );
        let (users, books, loans, activity) = (users?, books?, loans?, activity?);

        let performance = self.performance_summary();

        Ok(DailyStatistics {
            date,
            generated_at: Utc::now(),
            total_users: users.total,
            active_users: activity.active_users,
            new_users: activity.new_users,
            total_books: books.total,
            available_books: books.available,
            borrowed_books: books.total.saturating_sub(books.available),
            total_loans: activity.loans,
            total_returns: activity.returns,
            total_reservations: activity.reservations,
            total_searches: self
                .collector
                .counter_total("library_user_searches_total")
                .unwrap_or(0),
            total_fines_collected: round2(loans.collected_fines),
            outstanding_fines: round2(loans.outstanding_fines),
            avg_response_time_ms: performance.avg_response_time_ms.unwrap_or(0.0),
            error_rate: performance.error_rate,
        })
    }
}

impl std::fmt::Debug for AggregateComputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateComputer")
            .field("monitors", &self.monitors.keys().collect::<Vec<_>>())
            .field("activity_window", &self.activity_window)
            .finish()
    }
}
