//! Prometheus text exposition
//!
//! The exporter owns a set of aggregate gauges registered next to the
//! collector's counters. Each render recomputes the overview directly,
//! updates the gauges and encodes the whole registry.

use crate::aggregate::AggregateComputer;
use crate::error::{MonitorError, Result};
use crate::metrics::{Section, SystemOverview};
use prometheus::{Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

struct AggregateGauges {
    users_total: Gauge,
    active_users: Gauge,
    activity_rate: Gauge,
    books_total: Gauge,
    available_books: Gauge,
    availability_rate: Gauge,
    active_loans: Gauge,
    overdue_loans: Gauge,
    overdue_rate: Gauge,
    error_rate: Gauge,
    start_time: Gauge,
}

impl AggregateGauges {
    fn register(registry: &Registry) -> Result<Self> {
        let gauge = |name: &str, help: &str| -> Result<Gauge> {
            let g = Gauge::new(name, help)?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        Ok(Self {
            users_total: gauge("library_users_total", "Number of registered users")?,
            active_users: gauge(
                "library_active_users_total",
                "Users who logged in within the activity window",
            )?,
            activity_rate: gauge(
                "library_activity_rate_percent",
                "Active users as a percentage of all users",
            )?,
            books_total: gauge("library_books_total", "Number of catalogued books")?,
            available_books: gauge(
                "library_available_books_total",
                "Books with at least one available copy",
            )?,
            availability_rate: gauge(
                "library_availability_rate_percent",
                "Available books as a percentage of all books",
            )?,
            active_loans: gauge("library_active_loans_total", "Loans not yet returned")?,
            overdue_loans: gauge("library_overdue_loans_total", "Open loans past their due date")?,
            overdue_rate: gauge(
                "library_overdue_rate_percent",
                "Overdue loans as a percentage of open loans",
            )?,
            error_rate: gauge(
                "library_error_rate_percent",
                "API requests ending in a server error, in percent",
            )?,
            start_time: gauge(
                "library_start_time_seconds",
                "Start time of the process since unix epoch in seconds",
            )?,
        })
    }

    /// Sections that could not be computed keep their previous values
    fn update(&self, overview: &SystemOverview) {
        if !overview.section_failed(Section::Users) {
            self.users_total.set(overview.users.total as f64);
            self.active_users.set(overview.users.active as f64);
            self.activity_rate.set(overview.users.activity_rate);
        }
        if !overview.section_failed(Section::Books) {
            self.books_total.set(overview.books.total as f64);
            self.available_books.set(overview.books.available as f64);
            self.availability_rate.set(overview.books.availability_rate);
        }
        if !overview.section_failed(Section::Loans) {
            self.active_loans.set(overview.loans.active as f64);
            self.overdue_loans.set(overview.loans.overdue as f64);
            self.overdue_rate.set(overview.loans.overdue_rate);
        }
        self.error_rate.set(overview.performance.error_rate);
    }
}

/// Renders every metric in Prometheus text format
pub struct MetricsExporter {
    computer: Arc<AggregateComputer>,
    gauges: AggregateGauges,
}

impl MetricsExporter {
    /// Register the aggregate gauges in the collector's registry
    pub fn new(computer: Arc<AggregateComputer>) -> Result<Self> {
        let gauges = AggregateGauges::register(computer.collector().registry())?;
        gauges
            .start_time
            .set(computer.collector().started_at().timestamp() as f64);

        Ok(Self { computer, gauges })
    }

    /// Refresh the aggregate gauges and encode the registry
    pub async fn render(&self) -> Result<String> {
        let overview = self.computer.compute_system_overview().await;
        self.gauges.update(&overview);
        self.encode()
    }

    /// Encode the registry as it stands
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.computer.collector().registry().gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| MonitorError::computation(format!("exposition is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter").finish_non_exhaustive()
    }
}
