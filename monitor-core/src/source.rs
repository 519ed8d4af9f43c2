//! Domain data source boundary
//!
//! The monitoring core never owns library data. Everything it aggregates is
//! read through [`LibraryDataSource`]. [`InMemoryLibrary`] is a complete
//! implementation over plain records, loadable from a JSON fixture.

use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// User roles of the library system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Librarian,
    Teacher,
    Student,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Librarian => "librarian",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    PendingActivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
    Renewed,
    Lost,
    Damaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    #[serde(default)]
    pub is_fully_verified: bool,
    pub date_joined: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
    #[serde(default)]
    pub popularity_score: Option<f64>,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub total_borrows: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    #[serde(default)]
    pub fine_amount: f64,
    #[serde(default)]
    pub fine_paid: bool,
}

impl LoanRecord {
    /// A loan stays open until the book comes back
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    pub activity_type: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Users per role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: u64,
}

/// Books per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBrief {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularBook {
    pub id: Uuid,
    pub title: String,
    pub popularity_score: f64,
    pub total_views: u64,
    pub total_borrows: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBrief {
    pub id: u64,
    pub user: String,
    pub activity_type: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Raw user counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    /// Accounts in the `active` status
    pub active_accounts: u64,
    pub verified: u64,
    /// Users who logged in since the requested instant
    pub recent_logins: u64,
    /// Users who joined since the requested instant
    pub recent_registrations: u64,
    /// Sorted by count, largest first
    pub role_distribution: Vec<RoleCount>,
    /// Newest registrations since the requested instant, newest first
    pub newest_users: Vec<UserBrief>,
}

/// Raw book counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookStats {
    pub total: u64,
    /// Titles with at least one copy on the shelf
    pub available: u64,
    /// Titles with every copy out
    pub borrowed: u64,
    pub category_distribution: Vec<CategoryCount>,
    /// Highest popularity first
    pub popular: Vec<PopularBook>,
}

/// Raw loan and reservation counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanStats {
    pub total: u64,
    /// Loans without a return date
    pub active: u64,
    pub overdue: u64,
    pub loans_today: u64,
    pub returns_today: u64,
    pub total_reservations: u64,
    pub active_reservations: u64,
    pub outstanding_fines: f64,
    pub collected_fines: f64,
}

/// Raw analytics table counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsStats {
    pub activity_logs: u64,
    pub book_popularity: u64,
    pub system_statistics: u64,
    pub custom_reports: u64,
    /// Activity entries since the requested instant
    pub recent_activity: u64,
    /// Newest activity entries, newest first
    pub latest: Vec<ActivityBrief>,
}

/// Activity that happened on one calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub active_users: u64,
    pub new_users: u64,
    pub loans: u64,
    pub returns: u64,
    pub reservations: u64,
}

/// Read access to live library counts
#[async_trait]
pub trait LibraryDataSource: Send + Sync {
    /// Cheap reachability check of the backing store
    async fn ping(&self) -> Result<(), SourceError>;

    /// User counts, with `since` bounding the recent-login and registration windows
    async fn user_stats(&self, since: DateTime<Utc>) -> Result<UserStats, SourceError>;

    /// Book counts with the `top` most popular titles
    async fn book_stats(&self, top: usize) -> Result<BookStats, SourceError>;

    /// Loan and reservation counts as of `today`
    async fn loan_stats(&self, today: NaiveDate) -> Result<LoanStats, SourceError>;

    /// Analytics table counts with the `latest` newest activity entries since `since`
    async fn analytics_stats(
        &self,
        since: DateTime<Utc>,
        latest: usize,
    ) -> Result<AnalyticsStats, SourceError>;

    /// Activity recorded on `date`
    async fn daily_activity(&self, date: NaiveDate) -> Result<DailyActivity, SourceError>;
}

/// Serialized contents of an [`InMemoryLibrary`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryData {
    pub users: Vec<UserRecord>,
    pub books: Vec<BookRecord>,
    pub loans: Vec<LoanRecord>,
    pub reservations: Vec<ReservationRecord>,
    pub activity: Vec<ActivityRecord>,
    pub system_statistics_rows: u64,
    pub custom_reports: u64,
}

/// Library data held in memory
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    data: RwLock<LibraryData>,
    unavailable: AtomicBool,
}

impl InMemoryLibrary {
    pub fn new(data: LibraryData) -> Self {
        Self {
            data: RwLock::new(data),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Load a JSON fixture
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let data: LibraryData = serde_json::from_str(&raw)?;
        Ok(Self::new(data))
    }

    /// Simulate an outage of the backing store
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Apply a change to the stored records
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut LibraryData),
    {
        let mut data = self.data.write().await;
        f(&mut data);
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SourceError::Unavailable("in-memory store marked offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LibraryDataSource for InMemoryLibrary {
    async fn ping(&self) -> Result<(), SourceError> {
        self.check_available()
    }

    async fn user_stats(&self, since: DateTime<Utc>) -> Result<UserStats, SourceError> {
        self.check_available()?;
        let data = self.data.read().await;

        let mut roles: BTreeMap<UserRole, u64> = BTreeMap::new();
        for user in &data.users {
            *roles.entry(user.role).or_insert(0) += 1;
        }
        let mut role_distribution: Vec<RoleCount> = roles
            .into_iter()
            .map(|(role, count)| RoleCount { role, count })
            .collect();
        role_distribution.sort_by(|a, b| b.count.cmp(&a.count));

        let mut recent: Vec<&UserRecord> = data
            .users
            .iter()
            .filter(|u| u.date_joined >= since)
            .collect();
        recent.sort_by(|a, b| b.date_joined.cmp(&a.date_joined));

        Ok(UserStats {
            total: data.users.len() as u64,
            active_accounts: count(&data.users, |u| u.account_status == AccountStatus::Active),
            verified: count(&data.users, |u| u.is_fully_verified),
            recent_logins: count(&data.users, |u| u.last_login.is_some_and(|t| t >= since)),
            recent_registrations: recent.len() as u64,
            role_distribution,
            newest_users: recent
                .into_iter()
                .take(5)
                .map(|u| UserBrief {
                    id: u.id,
                    username: u.username.clone(),
                    role: u.role,
                    date_joined: u.date_joined,
                })
                .collect(),
        })
    }

    async fn book_stats(&self, top: usize) -> Result<BookStats, SourceError> {
        self.check_available()?;
        let data = self.data.read().await;

        let mut categories: BTreeMap<String, u64> = BTreeMap::new();
        for book in &data.books {
            let name = book.category.clone().unwrap_or_else(|| "Unknown".to_string());
            *categories.entry(name).or_insert(0) += 1;
        }
        let mut category_distribution: Vec<CategoryCount> = categories
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        category_distribution.sort_by(|a, b| b.count.cmp(&a.count));

        let mut popular: Vec<PopularBook> = data
            .books
            .iter()
            .filter_map(|b| {
                b.popularity_score.map(|score| PopularBook {
                    id: b.id,
                    title: b.title.clone(),
                    popularity_score: score,
                    total_views: b.total_views,
                    total_borrows: b.total_borrows,
                })
            })
            .collect();
        popular.sort_by(|a, b| {
            b.popularity_score
                .partial_cmp(&a.popularity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        popular.truncate(top);

        Ok(BookStats {
            total: data.books.len() as u64,
            available: count(&data.books, |b| b.available_copies > 0),
            borrowed: count(&data.books, |b| b.available_copies == 0),
            category_distribution,
            popular,
        })
    }

    async fn loan_stats(&self, today: NaiveDate) -> Result<LoanStats, SourceError> {
        self.check_available()?;
        let data = self.data.read().await;

        let (outstanding_fines, collected_fines) =
            data.loans.iter().fold((0.0, 0.0), |(outstanding, collected), l| {
                if l.fine_paid {
                    (outstanding, collected + l.fine_amount)
                } else {
                    (outstanding + l.fine_amount, collected)
                }
            });

        Ok(LoanStats {
            total: data.loans.len() as u64,
            active: count(&data.loans, LoanRecord::is_open),
            overdue: count(&data.loans, |l| l.is_overdue(today)),
            loans_today: count(&data.loans, |l| l.loan_date == today),
            returns_today: count(&data.loans, |l| l.return_date == Some(today)),
            total_reservations: data.reservations.len() as u64,
            active_reservations: count(&data.reservations, |r| r.status.is_active()),
            outstanding_fines,
            collected_fines,
        })
    }

    async fn analytics_stats(
        &self,
        since: DateTime<Utc>,
        latest: usize,
    ) -> Result<AnalyticsStats, SourceError> {
        self.check_available()?;
        let data = self.data.read().await;

        let mut recent: Vec<&ActivityRecord> =
            data.activity.iter().filter(|a| a.timestamp >= since).collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(AnalyticsStats {
            activity_logs: data.activity.len() as u64,
            book_popularity: count(&data.books, |b| b.popularity_score.is_some()),
            system_statistics: data.system_statistics_rows,
            custom_reports: data.custom_reports,
            recent_activity: recent.len() as u64,
            latest: recent
                .into_iter()
                .take(latest)
                .map(|a| ActivityBrief {
                    id: a.id,
                    user: a.username.clone().unwrap_or_else(|| "Anonymous".to_string()),
                    activity_type: a.activity_type.clone(),
                    timestamp: a.timestamp,
                    description: a.description.chars().take(100).collect(),
                })
                .collect(),
        })
    }

    async fn daily_activity(&self, date: NaiveDate) -> Result<DailyActivity, SourceError> {
        self.check_available()?;
        let data = self.data.read().await;

        Ok(DailyActivity {
            active_users: count(&data.users, |u| {
                u.last_login.is_some_and(|t| t.date_naive() == date)
            }),
            new_users: count(&data.users, |u| u.date_joined.date_naive() == date),
            loans: count(&data.loans, |l| l.loan_date == date),
            returns: count(&data.loans, |l| l.return_date == Some(date)),
            reservations: count(&data.reservations, |r| r.reserved_at.date_naive() == date),
        })
    }
}

fn count<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> u64 {
    items.iter().filter(|item| predicate(item)).count() as u64
}
