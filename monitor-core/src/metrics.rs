//! Aggregate types computed by the monitoring core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of one snapshot section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Healthy,
    Warning,
    Critical,
    /// The section could not be computed or has nothing to measure
    Unknown,
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionStatus::Healthy => write!(f, "healthy"),
            SectionStatus::Warning => write!(f, "warning"),
            SectionStatus::Critical => write!(f, "critical"),
            SectionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Sections of a system overview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Users,
    Books,
    Loans,
    Performance,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Users => write!(f, "users"),
            Section::Books => write!(f, "books"),
            Section::Loans => write!(f, "loans"),
            Section::Performance => write!(f, "performance"),
        }
    }
}

/// `numerator / denominator * 100` rounded to two decimals, 0 on an empty denominator
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Registered users and how many logged in recently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Registered users
    pub total: u64,
    /// Users with a login inside the activity window
    pub active: u64,
    /// `active` as a percentage of `total`
    pub activity_rate: f64,
    /// Section status
    pub status: SectionStatus,
}

/// Catalogue size and shelf availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Titles in the catalogue
    pub total: u64,
    /// Titles with at least one copy on the shelf
    pub available: u64,
    /// `available` as a percentage of `total`
    pub availability_rate: f64,
    /// Section status
    pub status: SectionStatus,
}

/// Open loans and how many are past due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    /// Loans not yet returned
    pub active: u64,
    /// Open loans past their due date
    pub overdue: u64,
    /// `overdue` as a percentage of `active`
    pub overdue_rate: f64,
    /// Section status
    pub status: SectionStatus,
}

/// API request volume, errors and latency since startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Requests tracked since startup
    pub requests_total: u64,
    /// Percentage of requests answered with a 5xx status
    pub error_rate: f64,
    /// `None` until a request duration has been recorded
    pub avg_response_time_ms: Option<f64>,
    /// `None` until a request duration has been recorded
    pub p95_response_time_ms: Option<f64>,
    /// Section status
    pub status: SectionStatus,
}

impl UserSummary {
    /// Unknown status when there are no users
    pub fn new(total: u64, active: u64) -> Self {
        Self {
            total,
            active,
            activity_rate: percentage(active, total),
            status: if total == 0 {
                SectionStatus::Unknown
            } else {
                SectionStatus::Healthy
            },
        }
    }

    /// Placeholder for a section whose data could not be read
    pub fn unavailable() -> Self {
        Self {
            total: 0,
            active: 0,
            activity_rate: 0.0,
            status: SectionStatus::Unknown,
        }
    }
}

impl BookSummary {
    /// Unknown status when the catalogue is empty
    pub fn new(total: u64, available: u64) -> Self {
        Self {
            total,
            available,
            availability_rate: percentage(available, total),
            status: if total == 0 {
                SectionStatus::Unknown
            } else {
                SectionStatus::Healthy
            },
        }
    }

    /// Placeholder for a section whose data could not be read
    pub fn unavailable() -> Self {
        Self {
            total: 0,
            available: 0,
            availability_rate: 0.0,
            status: SectionStatus::Unknown,
        }
    }
}

impl LoanSummary {
    /// An empty loan book is healthy: nothing can be overdue
    pub fn new(active: u64, overdue: u64) -> Self {
        Self {
            active,
            overdue,
            overdue_rate: percentage(overdue, active),
            status: SectionStatus::Healthy,
        }
    }

    /// Placeholder for a section whose data could not be read
    pub fn unavailable() -> Self {
        Self {
            active: 0,
            overdue: 0,
            overdue_rate: 0.0,
            status: SectionStatus::Unknown,
        }
    }
}

/// Counts and derived rates for the whole system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemOverview {
    pub computed_at: DateTime<Utc>,
    pub users: UserSummary,
    pub books: BookSummary,
    pub loans: LoanSummary,
    pub performance: PerformanceSummary,
    /// Sections whose data could not be read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sections: Vec<Section>,
}

impl SystemOverview {
    pub fn section_failed(&self, section: Section) -> bool {
        self.failed_sections.contains(&section)
    }

    /// Status of one section
    pub fn section_status(&self, section: Section) -> SectionStatus {
        match section {
            Section::Users => self.users.status,
            Section::Books => self.books.status,
            Section::Loans => self.loans.status,
            Section::Performance => self.performance.status,
        }
    }

    pub fn set_section_status(&mut self, section: Section, status: SectionStatus) {
        match section {
            Section::Users => self.users.status = status,
            Section::Books => self.books.status = status,
            Section::Loans => self.loans.status = status,
            Section::Performance => self.performance.status = status,
        }
    }

    /// Metric values the alert evaluator may compare against thresholds.
    ///
    /// Rates of sections that failed, or whose denominator is zero, are left
    /// out so rules on them cannot fire on missing data.
    pub fn alert_inputs(&self) -> BTreeMap<String, f64> {
        let mut inputs = BTreeMap::new();

        if self.users.status != SectionStatus::Unknown {
            inputs.insert("total_users".to_string(), self.users.total as f64);
            inputs.insert("active_users".to_string(), self.users.active as f64);
            if self.users.total > 0 {
                inputs.insert("activity_rate".to_string(), self.users.activity_rate);
            }
        }

        if self.books.status != SectionStatus::Unknown {
            inputs.insert("total_books".to_string(), self.books.total as f64);
            inputs.insert("available_books".to_string(), self.books.available as f64);
            if self.books.total > 0 {
                inputs.insert(
                    "availability_rate".to_string(),
                    self.books.availability_rate,
                );
            }
        }

        if self.loans.status != SectionStatus::Unknown {
            inputs.insert("active_loans".to_string(), self.loans.active as f64);
            inputs.insert("overdue_loans".to_string(), self.loans.overdue as f64);
            if self.loans.active > 0 {
                inputs.insert("overdue_rate".to_string(), self.loans.overdue_rate);
            }
        }

        inputs.insert("error_rate".to_string(), self.performance.error_rate);
        inputs.insert(
            "requests_total".to_string(),
            self.performance.requests_total as f64,
        );
        if let Some(avg) = self.performance.avg_response_time_ms {
            inputs.insert("avg_response_time_ms".to_string(), avg);
        }
        if let Some(p95) = self.performance.p95_response_time_ms {
            inputs.insert("p95_response_time_ms".to_string(), p95);
        }

        inputs
    }
}

/// Totals exposed on the unauthenticated dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicSummary {
    pub total_users: u64,
    pub total_books: u64,
    pub available_books: u64,
    pub active_loans: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&SystemOverview> for PublicSummary {
    fn from(overview: &SystemOverview) -> Self {
        Self {
            total_users: overview.users.total,
            total_books: overview.books.total,
            available_books: overview.books.available,
            active_loans: overview.loans.active,
            timestamp: overview.computed_at,
        }
    }
}
