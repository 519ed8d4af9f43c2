//! Unit tests for aggregate computation

#[cfg(test)]
mod tests {
    use crate::metrics::{Section, SectionStatus};
    use crate::models::{ModelReport, MonitoredModel};
    use crate::source::{
        ActivityRecord, LibraryData, LoanRecord, ReservationRecord, ReservationStatus, UserRole,
    };
    use crate::test_support::{fixture, library, open_loan, returned_loan, today, user};
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_empty_library_has_zero_rates() {
        let fx = fixture(LibraryData::default());
        let overview = fx.computer.compute_system_overview().await;

        assert_eq!(overview.users.activity_rate, 0.0);
        assert_eq!(overview.books.availability_rate, 0.0);
        assert_eq!(overview.loans.overdue_rate, 0.0);
        assert_eq!(overview.performance.error_rate, 0.0);
        assert!(overview.failed_sections.is_empty());
    }

    #[tokio::test]
    async fn test_no_users_leaves_users_section_unknown() {
        let fx = fixture(library(0, 0, 3, 3));
        let overview = fx.computer.compute_system_overview().await;

        assert_eq!(overview.users.activity_rate, 0.0);
        assert_eq!(overview.users.status, SectionStatus::Unknown);
        assert!(!overview.alert_inputs().contains_key("activity_rate"));
    }

    #[tokio::test]
    async fn test_availability_rate_is_rounded() {
        let fx = fixture(library(1, 1, 1200, 800));
        let overview = fx.computer.compute_system_overview().await;

        assert_eq!(overview.books.total, 1200);
        assert_eq!(overview.books.available, 800);
        assert_eq!(overview.books.availability_rate, 66.67);
    }

    #[tokio::test]
    async fn test_activity_rate_stays_within_bounds() {
        for (total, active) in [(1, 0), (1, 1), (3, 1), (7, 7), (9, 4)] {
            let fx = fixture(library(total, active, 0, 0));
            let overview = fx.computer.compute_system_overview().await;
            let rate = overview.users.activity_rate;
            assert!((0.0..=100.0).contains(&rate), "{total}/{active} gave {rate}");
        }
    }

    #[tokio::test]
    async fn test_users_outside_activity_window_are_inactive() {
        let mut data = LibraryData::default();
        data.users.push(user(UserRole::Student, Some(1)));
        data.users.push(user(UserRole::Student, Some(30)));
        data.users.push(user(UserRole::Teacher, None));

        let fx = fixture(data);
        let overview = fx.computer.compute_system_overview().await;
        assert_eq!(overview.users.total, 3);
        assert_eq!(overview.users.active, 1);
        assert_eq!(overview.users.activity_rate, 33.33);
    }

    #[tokio::test]
    async fn test_overdue_counts_only_open_loans_past_due() {
        let mut data = LibraryData::default();
        data.loans = vec![
            open_loan(3),
            open_loan(-2),
            open_loan(-10),
            open_loan(0),
            returned_loan(today()),
        ];

        let fx = fixture(data);
        let overview = fx.computer.compute_system_overview().await;
        assert_eq!(overview.loans.active, 4);
        assert_eq!(overview.loans.overdue, 2);
        assert_eq!(overview.loans.overdue_rate, 50.0);
    }

    #[tokio::test]
    async fn test_source_failure_isolated_per_section() {
        let fx = fixture(library(4, 2, 4, 2));
        fx.library.set_available(false);

        let overview = fx.computer.compute_system_overview().await;
        assert_eq!(overview.users.status, SectionStatus::Unknown);
        assert_eq!(overview.books.status, SectionStatus::Unknown);
        assert_eq!(overview.loans.status, SectionStatus::Unknown);
        assert_eq!(overview.users.total, 0);
        assert!(overview.section_failed(Section::Books));

        let inputs = overview.alert_inputs();
        assert!(!inputs.contains_key("availability_rate"));
        assert!(!inputs.contains_key("overdue_rate"));
        assert!(inputs.contains_key("error_rate"));
    }

    #[tokio::test]
    async fn test_performance_section_reads_collector() {
        let fx = fixture(LibraryData::default());
        for _ in 0..19 {
            fx.collector
                .track_api_request("GET", 200, StdDuration::from_millis(100));
        }
        fx.collector
            .track_api_request("POST", 503, StdDuration::from_millis(300));

        let overview = fx.computer.compute_system_overview().await;
        let performance = overview.performance;
        assert_eq!(performance.requests_total, 20);
        assert_eq!(performance.error_rate, 5.0);
        assert_eq!(performance.avg_response_time_ms, Some(110.0));
        assert_eq!(performance.p95_response_time_ms, Some(300.0));
    }

    #[tokio::test]
    async fn test_no_latency_figures_before_first_request() {
        let fx = fixture(LibraryData::default());
        let overview = fx.computer.compute_system_overview().await;
        assert_eq!(overview.performance.avg_response_time_ms, None);
        assert_eq!(overview.performance.p95_response_time_ms, None);
        assert!(!overview.alert_inputs().contains_key("avg_response_time_ms"));
    }

    #[tokio::test]
    async fn test_model_metrics_dispatch() {
        let fx = fixture(library(10, 8, 5, 5));
        for model in MonitoredModel::ALL {
            let report = fx.computer.compute_model_metrics(model).await.unwrap();
            assert_eq!(report.model(), model);
        }
    }

    #[tokio::test]
    async fn test_user_report_counts() {
        let mut data = library(4, 2, 0, 0);
        data.users[0].is_fully_verified = false;
        data.users[1].role = UserRole::Librarian;

        let fx = fixture(data);
        let report = fx
            .computer
            .compute_model_metrics(MonitoredModel::Users)
            .await
            .unwrap();
        let ModelReport::Users(report) = report else {
            panic!("expected a user report");
        };
        assert_eq!(report.statistics.total, 4);
        assert_eq!(report.statistics.verified, 3);
        assert_eq!(report.statistics.recent_logins, 2);
        assert_eq!(report.statistics.role_distribution[0].role, UserRole::Member);
        assert_eq!(report.statistics.role_distribution[0].count, 3);
        assert_eq!(report.verification_rate, 75.0);
    }

    #[tokio::test]
    async fn test_loan_report_includes_reservations_and_fines() {
        let mut data = LibraryData::default();
        let mut fined = returned_loan(today());
        fined.fine_amount = 2.5;
        fined.fine_paid = true;
        let mut unpaid: LoanRecord = open_loan(-3);
        unpaid.fine_amount = 1.5;
        data.loans = vec![fined, unpaid, open_loan(5)];
        data.reservations = vec![
            ReservationRecord {
                id: uuid::Uuid::new_v4(),
                status: ReservationStatus::Pending,
                reserved_at: Utc::now(),
            },
            ReservationRecord {
                id: uuid::Uuid::new_v4(),
                status: ReservationStatus::Fulfilled,
                reserved_at: Utc::now(),
            },
        ];

        let fx = fixture(data);
        let ModelReport::Loans(report) = fx
            .computer
            .compute_model_metrics(MonitoredModel::Loans)
            .await
            .unwrap()
        else {
            panic!("expected a loan report");
        };
        assert_eq!(report.statistics.total, 3);
        assert_eq!(report.statistics.active, 2);
        assert_eq!(report.statistics.overdue, 1);
        assert_eq!(report.statistics.returns_today, 1);
        assert_eq!(report.statistics.total_reservations, 2);
        assert_eq!(report.statistics.active_reservations, 1);
        assert_eq!(report.statistics.collected_fines, 2.5);
        assert_eq!(report.statistics.outstanding_fines, 1.5);
        assert_eq!(report.overdue_rate, 50.0);
        assert_eq!(report.health.status, SectionStatus::Critical);
    }

    #[tokio::test]
    async fn test_analytics_report_lists_newest_first() {
        let mut data = LibraryData::default();
        data.activity = (0..15)
            .map(|i| ActivityRecord {
                id: i,
                username: None,
                activity_type: "search".to_string(),
                description: "catalog search".to_string(),
                timestamp: Utc::now() - Duration::minutes(i as i64),
            })
            .collect();

        let fx = fixture(data);
        let ModelReport::Analytics(report) = fx
            .computer
            .compute_model_metrics(MonitoredModel::Analytics)
            .await
            .unwrap()
        else {
            panic!("expected an analytics report");
        };
        assert_eq!(report.statistics.recent_activity, 15);
        assert_eq!(report.statistics.latest.len(), 10);
        assert_eq!(report.statistics.latest[0].id, 0);
        assert_eq!(report.statistics.latest[0].user, "Anonymous");
    }

    #[tokio::test]
    async fn test_daily_statistics() {
        let yesterday = today() - Duration::days(1);
        let mut data = library(3, 0, 4, 3);
        data.users[0].last_login = Some(Utc::now() - Duration::days(1));
        data.loans = vec![returned_loan(yesterday)];

        let fx = fixture(data);
        fx.collector.track_search_query("title", "member");
        fx.collector.track_search_query("author", "member");

        let stats = fx
            .computer
            .compute_daily_statistics(yesterday)
            .await
            .unwrap();
        assert_eq!(stats.date, yesterday);
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.total_books, 4);
        assert_eq!(stats.available_books, 3);
        assert_eq!(stats.borrowed_books, 1);
        assert_eq!(stats.total_returns, 1);
        assert_eq!(stats.total_searches, 2);
    }

    #[tokio::test]
    async fn test_daily_statistics_fail_when_source_is_down() {
        let fx = fixture(LibraryData::default());
        fx.library.set_available(false);
        assert!(fx.computer.compute_daily_statistics(today()).await.is_err());
    }
}
