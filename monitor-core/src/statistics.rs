//! Daily statistics record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Activity and inventory figures for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,

    pub total_users: u64,
    /// Users whose last login fell on `date`
    pub active_users: u64,
    pub new_users: u64,

    pub total_books: u64,
    pub available_books: u64,
    pub borrowed_books: u64,

    pub total_loans: u64,
    pub total_returns: u64,
    pub total_reservations: u64,

    /// Searches tracked by this process since it started
    pub total_searches: u64,

    pub total_fines_collected: f64,
    pub outstanding_fines: f64,

    pub avg_response_time_ms: f64,
    pub error_rate: f64,
}

impl DailyStatistics {
    /// `(label, value)` pairs for plain-text output
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date", self.date.to_string()),
            ("total users", self.total_users.to_string()),
            ("active users", self.active_users.to_string()),
            ("new users", self.new_users.to_string()),
            ("total books", self.total_books.to_string()),
            ("available books", self.available_books.to_string()),
            ("borrowed books", self.borrowed_books.to_string()),
            ("loans", self.total_loans.to_string()),
            ("returns", self.total_returns.to_string()),
            ("reservations", self.total_reservations.to_string()),
            ("searches", self.total_searches.to_string()),
            ("fines collected", format!("{:.2}", self.total_fines_collected)),
            ("outstanding fines", format!("{:.2}", self.outstanding_fines)),
            ("avg response time ms", format!("{:.2}", self.avg_response_time_ms)),
            ("error rate %", format!("{:.2}", self.error_rate)),
        ]
    }
}
