//! Per-model monitoring reports
//!
//! Each monitored model has a [`ModelMonitor`] strategy that turns data
//! source statistics into a report with derived rates and health findings.
//! The [`crate::aggregate::AggregateComputer`] dispatches to them by
//! [`MonitoredModel`].

use crate::alerting::AlertSeverity;
use crate::error::{MonitorError, Result};
use crate::metrics::{SectionStatus, percentage, round2};
use crate::source::{AnalyticsStats, BookStats, LibraryDataSource, LoanStats, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of popular books listed in the book report
pub const POPULAR_BOOKS: usize = 5;

/// Number of activity entries listed in the analytics report
pub const LATEST_ACTIVITY: usize = 10;

/// Activity log count above which archiving is suggested
pub const ACTIVITY_LOG_ARCHIVE_THRESHOLD: u64 = 100_000;

/// Models with a dedicated monitoring report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoredModel {
    Users,
    Books,
    Loans,
    Analytics,
}

impl MonitoredModel {
    pub const ALL: [MonitoredModel; 4] = [
        MonitoredModel::Users,
        MonitoredModel::Books,
        MonitoredModel::Loans,
        MonitoredModel::Analytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoredModel::Users => "users",
            MonitoredModel::Books => "books",
            MonitoredModel::Loans => "loans",
            MonitoredModel::Analytics => "analytics",
        }
    }
}

impl fmt::Display for MonitoredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitoredModel {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "users" => Ok(MonitoredModel::Users),
            "books" => Ok(MonitoredModel::Books),
            "loans" => Ok(MonitoredModel::Loans),
            "analytics" => Ok(MonitoredModel::Analytics),
            other => Err(MonitorError::UnknownModel(other.to_string())),
        }
    }
}

/// A finding attached to a model report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub level: AlertSeverity,
    pub message: String,
}

/// Health of a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHealth {
    pub status: SectionStatus,
    pub findings: Vec<Finding>,
}

impl Default for ModelHealth {
    fn default() -> Self {
        Self {
            status: SectionStatus::Healthy,
            findings: Vec::new(),
        }
    }
}

impl ModelHealth {
    /// Add a finding; the status only ever gets worse
    pub fn raise(&mut self, level: AlertSeverity, message: impl Into<String>) {
        let floor = match level {
            AlertSeverity::Critical => SectionStatus::Critical,
            AlertSeverity::Warning => SectionStatus::Warning,
            AlertSeverity::Info => SectionStatus::Healthy,
        };
        self.status = self.status.max(floor);
        self.findings.push(Finding {
            level,
            message: message.into(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReport {
    pub timestamp: DateTime<Utc>,
    pub statistics: UserStats,
    pub activity_rate: f64,
    pub verification_rate: f64,
    pub health: ModelHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookReport {
    pub timestamp: DateTime<Utc>,
    pub statistics: BookStats,
    pub availability_rate: f64,
    pub utilization_rate: f64,
    pub avg_popularity_score: f64,
    pub health: ModelHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanReport {
    pub timestamp: DateTime<Utc>,
    pub statistics: LoanStats,
    pub overdue_rate: f64,
    pub health: ModelHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub timestamp: DateTime<Utc>,
    pub statistics: AnalyticsStats,
    pub total_records: u64,
    pub avg_logs_per_hour: f64,
    pub health: ModelHealth,
}

/// Report for one monitored model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum ModelReport {
    Users(UserReport),
    Books(BookReport),
    Loans(LoanReport),
    Analytics(AnalyticsReport),
}

impl ModelReport {
    pub fn model(&self) -> MonitoredModel {
        match self {
            ModelReport::Users(_) => MonitoredModel::Users,
            ModelReport::Books(_) => MonitoredModel::Books,
            ModelReport::Loans(_) => MonitoredModel::Loans,
            ModelReport::Analytics(_) => MonitoredModel::Analytics,
        }
    }

    pub fn health(&self) -> &ModelHealth {
        match self {
            ModelReport::Users(r) => &r.health,
            ModelReport::Books(r) => &r.health,
            ModelReport::Loans(r) => &r.health,
            ModelReport::Analytics(r) => &r.health,
        }
    }
}

/// Inputs shared by every report computation
#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    pub now: DateTime<Utc>,
    /// Window for "recent" logins and registrations
    pub activity_window: Duration,
}

/// Strategy computing the report of one model
#[async_trait]
pub trait ModelMonitor: Send + Sync {
    fn model(&self) -> MonitoredModel;

    async fn report(
        &self,
        source: &dyn LibraryDataSource,
        ctx: &ReportContext,
    ) -> Result<ModelReport>;
}

pub struct UserMonitor;

#[async_trait]
impl ModelMonitor for UserMonitor {
    fn model(&self) -> MonitoredModel {
        MonitoredModel::Users
    }

    async fn report(
        &self,
        source: &dyn LibraryDataSource,
        ctx: &ReportContext,
    ) -> Result<ModelReport> {
        let statistics = source.user_stats(ctx.now - ctx.activity_window).await?;
        Ok(ModelReport::Users(user_report(statistics, ctx.now)))
    }
}

fn user_report(statistics: UserStats, timestamp: DateTime<Utc>) -> UserReport {
    let activity_rate = percentage(statistics.active_accounts, statistics.total);
    let verification_rate = percentage(statistics.verified, statistics.total);

    let mut health = ModelHealth::default();
    if statistics.total == 0 {
        health.raise(AlertSeverity::Critical, "No users in the system");
    } else {
        if activity_rate < 50.0 {
            health.raise(
                AlertSeverity::Warning,
                "Low user activity rate - less than 50% of users are active",
            );
        }
        if verification_rate < 30.0 {
            health.raise(
                AlertSeverity::Warning,
                "Low verification rate - less than 30% of users are verified",
            );
        }
    }

    UserReport {
        timestamp,
        statistics,
        activity_rate,
        verification_rate,
        health,
    }
}

pub struct BookMonitor;

#[async_trait]
impl ModelMonitor for BookMonitor {
    fn model(&self) -> MonitoredModel {
        MonitoredModel::Books
    }

    async fn report(
        &self,
        source: &dyn LibraryDataSource,
        ctx: &ReportContext,
    ) -> Result<ModelReport> {
        let statistics = source.book_stats(POPULAR_BOOKS).await?;
        Ok(ModelReport::Books(book_report(statistics, ctx.now)))
    }
}

fn book_report(statistics: BookStats, timestamp: DateTime<Utc>) -> BookReport {
    let availability_rate = percentage(statistics.available, statistics.total);
    let utilization_rate = percentage(statistics.borrowed, statistics.total);
    let avg_popularity_score = if statistics.popular.is_empty() {
        0.0
    } else {
        round2(
            statistics
                .popular
                .iter()
                .map(|b| b.popularity_score)
                .sum::<f64>()
                / statistics.popular.len() as f64,
        )
    };

    let mut health = ModelHealth::default();
    if statistics.total == 0 {
        health.raise(AlertSeverity::Critical, "No books in the system");
    } else if availability_rate < 10.0 {
        health.raise(
            AlertSeverity::Warning,
            "Low book availability - less than 10% of books are available",
        );
    }

    BookReport {
        timestamp,
        statistics,
        availability_rate,
        utilization_rate,
        avg_popularity_score,
        health,
    }
}

pub struct LoanMonitor;

#[async_trait]
impl ModelMonitor for LoanMonitor {
    fn model(&self) -> MonitoredModel {
        MonitoredModel::Loans
    }

    async fn report(
        &self,
        source: &dyn LibraryDataSource,
        ctx: &ReportContext,
    ) -> Result<ModelReport> {
        let statistics = source.loan_stats(ctx.now.date_naive()).await?;
        Ok(ModelReport::Loans(loan_report(statistics, ctx.now)))
    }
}

fn loan_report(statistics: LoanStats, timestamp: DateTime<Utc>) -> LoanReport {
    let overdue_rate = percentage(statistics.overdue, statistics.active);

    let mut health = ModelHealth::default();
    if statistics.overdue > 0 {
        let level = if overdue_rate > 10.0 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        health.raise(level, format!("{} overdue loans", statistics.overdue));
    }

    LoanReport {
        timestamp,
        statistics,
        overdue_rate,
        health,
    }
}

pub struct AnalyticsMonitor;

#[async_trait]
impl ModelMonitor for AnalyticsMonitor {
    fn model(&self) -> MonitoredModel {
        MonitoredModel::Analytics
    }

    async fn report(
        &self,
        source: &dyn LibraryDataSource,
        ctx: &ReportContext,
    ) -> Result<ModelReport> {
        let statistics = source
            .analytics_stats(ctx.now - Duration::hours(24), LATEST_ACTIVITY)
            .await?;
        Ok(ModelReport::Analytics(analytics_report(statistics, ctx.now)))
    }
}

fn analytics_report(statistics: AnalyticsStats, timestamp: DateTime<Utc>) -> AnalyticsReport {
    let total_records =
        statistics.activity_logs + statistics.book_popularity + statistics.system_statistics;
    let avg_logs_per_hour = round2(statistics.recent_activity as f64 / 24.0);

    let mut health = ModelHealth::default();
    if statistics.recent_activity == 0 {
        health.raise(
            AlertSeverity::Warning,
            "No recent activity logged in the last 24 hours",
        );
    }
    if statistics.activity_logs > ACTIVITY_LOG_ARCHIVE_THRESHOLD {
        health.raise(
            AlertSeverity::Info,
            "Large number of activity logs - consider archiving old data",
        );
    }

    AnalyticsReport {
        timestamp,
        statistics,
        total_records,
        avg_logs_per_hour,
        health,
    }
}

/// The strategies for every [`MonitoredModel`]
pub fn default_monitors() -> Vec<Box<dyn ModelMonitor>> {
    vec![
        Box::new(UserMonitor),
        Box::new(BookMonitor),
        Box::new(LoanMonitor),
        Box::new(AnalyticsMonitor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CategoryCount, PopularBook, RoleCount, UserRole};
    use uuid::Uuid;

    fn users(total: u64, active: u64, verified: u64) -> UserStats {
        UserStats {
            total,
            active_accounts: active,
            verified,
            recent_logins: 0,
            recent_registrations: 0,
            role_distribution: vec![RoleCount {
                role: UserRole::Student,
                count: total,
            }],
            newest_users: Vec::new(),
        }
    }

    #[test]
    fn test_model_names_round_trip() {
        for model in MonitoredModel::ALL {
            assert_eq!(model.as_str().parse::<MonitoredModel>().unwrap(), model);
        }
        assert!(matches!(
            "reservations".parse::<MonitoredModel>(),
            Err(MonitorError::UnknownModel(name)) if name == "reservations"
        ));
    }

    #[test]
    fn test_no_users_is_critical_only() {
        let report = user_report(users(0, 0, 0), Utc::now());
        assert_eq!(report.health.status, SectionStatus::Critical);
        assert_eq!(report.health.findings.len(), 1);
        assert_eq!(report.activity_rate, 0.0);
    }

    #[test]
    fn test_low_user_activity_and_verification_warn() {
        let report = user_report(users(10, 4, 2), Utc::now());
        assert_eq!(report.activity_rate, 40.0);
        assert_eq!(report.verification_rate, 20.0);
        assert_eq!(report.health.status, SectionStatus::Warning);
        assert_eq!(report.health.findings.len(), 2);
    }

    #[test]
    fn test_healthy_users() {
        let report = user_report(users(10, 8, 5), Utc::now());
        assert_eq!(report.health, ModelHealth::default());
    }

    #[test]
    fn test_book_report_rates() {
        let statistics = BookStats {
            total: 3,
            available: 2,
            borrowed: 1,
            category_distribution: vec![CategoryCount {
                category: "Fiction".to_string(),
                count: 3,
            }],
            popular: vec![
                PopularBook {
                    id: Uuid::new_v4(),
                    title: "Dune".to_string(),
                    popularity_score: 9.0,
                    total_views: 100,
                    total_borrows: 20,
                },
                PopularBook {
                    id: Uuid::new_v4(),
                    title: "Emma".to_string(),
                    popularity_score: 6.0,
                    total_views: 40,
                    total_borrows: 5,
                },
            ],
        };
        let report = book_report(statistics, Utc::now());
        assert_eq!(report.availability_rate, 66.67);
        assert_eq!(report.utilization_rate, 33.33);
        assert_eq!(report.avg_popularity_score, 7.5);
        assert_eq!(report.health.status, SectionStatus::Healthy);
    }

    #[test]
    fn test_overdue_loans_escalate() {
        let mut statistics = LoanStats {
            total: 40,
            active: 20,
            overdue: 1,
            loans_today: 0,
            returns_today: 0,
            total_reservations: 0,
            active_reservations: 0,
            outstanding_fines: 0.0,
            collected_fines: 0.0,
        };
        let report = loan_report(statistics.clone(), Utc::now());
        assert_eq!(report.overdue_rate, 5.0);
        assert_eq!(report.health.status, SectionStatus::Warning);
        assert_eq!(report.health.findings[0].message, "1 overdue loans");

        statistics.overdue = 3;
        let report = loan_report(statistics, Utc::now());
        assert_eq!(report.health.status, SectionStatus::Critical);
    }

    #[test]
    fn test_archive_hint_does_not_degrade_health() {
        let statistics = AnalyticsStats {
            activity_logs: 150_000,
            book_popularity: 10,
            system_statistics: 5,
            custom_reports: 1,
            recent_activity: 48,
            latest: Vec::new(),
        };
        let report = analytics_report(statistics, Utc::now());
        assert_eq!(report.avg_logs_per_hour, 2.0);
        assert_eq!(report.total_records, 150_015);
        assert_eq!(report.health.status, SectionStatus::Healthy);
        assert_eq!(report.health.findings[0].level, AlertSeverity::Info);
    }

    #[test]
    fn test_report_serializes_with_model_tag() {
        let report = ModelReport::Loans(loan_report(
            LoanStats {
                total: 0,
                active: 0,
                overdue: 0,
                loans_today: 0,
                returns_today: 0,
                total_reservations: 0,
                active_reservations: 0,
                outstanding_fines: 0.0,
                collected_fines: 0.0,
            },
            Utc::now(),
        ));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["model"], "loans");
        assert_eq!(json["health"]["status"], "healthy");
    }
}
