//! Fixtures shared by the unit tests

use crate::aggregate::AggregateComputer;
use crate::collector::MetricCollector;
use crate::config::MonitoringConfig;
use crate::source::{
    AccountStatus, BookRecord, InMemoryLibrary, LibraryData, LoanRecord, LoanStatus, UserRecord,
    UserRole,
};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A user who last logged in `days_ago` days ago, or never
pub fn user(role: UserRole, days_ago: Option<i64>) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        username: format!("user-{}", Uuid::new_v4().simple()),
        role,
        account_status: AccountStatus::Active,
        is_fully_verified: true,
        date_joined: Utc::now() - Duration::days(400),
        last_login: days_ago.map(|d| Utc::now() - Duration::days(d)),
    }
}

pub fn book(title: &str, total_copies: u32, available_copies: u32) -> BookRecord {
    BookRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        category: Some("Fiction".to_string()),
        total_copies,
        available_copies,
        popularity_score: None,
        total_views: 0,
        total_borrows: 0,
    }
}

/// An open loan due `due_in_days` from today (negative means overdue)
pub fn open_loan(due_in_days: i64) -> LoanRecord {
    let today = today();
    LoanRecord {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        book_id: Uuid::new_v4(),
        loan_date: today - Duration::days(14),
        due_date: today + Duration::days(due_in_days),
        return_date: None,
        status: LoanStatus::Active,
        fine_amount: 0.0,
        fine_paid: false,
    }
}

pub fn returned_loan(on: NaiveDate) -> LoanRecord {
    LoanRecord {
        return_date: Some(on),
        status: LoanStatus::Returned,
        ..open_loan(0)
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `active` recent users out of `total`, `available` shelved books out of `books`
pub fn library(total: usize, active: usize, books: usize, available: usize) -> LibraryData {
    let users = (0..total)
        .map(|i| user(UserRole::Member, (i < active).then_some(1)))
        .collect();
    let books = (0..books)
        .map(|i| book(&format!("Book {i}"), 1, u32::from(i < available)))
        .collect();

    LibraryData {
        users,
        books,
        ..LibraryData::default()
    }
}

pub struct Fixture {
    pub library: Arc<InMemoryLibrary>,
    pub collector: Arc<MetricCollector>,
    pub computer: Arc<AggregateComputer>,
}

pub fn fixture(data: LibraryData) -> Fixture {
    fixture_with(data, &MonitoringConfig::default())
}

pub fn fixture_with(data: LibraryData, config: &MonitoringConfig) -> Fixture {
    let library = Arc::new(InMemoryLibrary::new(data));
    let collector = Arc::new(MetricCollector::new(config).unwrap());
    let computer = Arc::new(AggregateComputer::new(
        library.clone(),
        collector.clone(),
        config,
    ));
    Fixture {
        library,
        collector,
        computer,
    }
}
