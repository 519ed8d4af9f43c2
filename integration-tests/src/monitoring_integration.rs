//! Integration tests for monitoring across collector, cache, alerts and exporter

use crate::test_utils::*;
use chrono::Utc;
use libris_monitor_core::{AlertSeverity, MonitorError, SectionStatus, SystemStatus};
use std::time::Duration;

#[tokio::test]
async fn test_collector_events_drive_alerts() {
    let state = test_state(sample_library());
    state
        .collector
        .track_api_request("GET", 500, Duration::from_millis(40));
    state
        .collector
        .track_api_request("GET", 200, Duration::from_millis(20));
    state.reporter.refresh().await;

    let snapshot = state.reporter.snapshot().await;
    let rules: Vec<&str> = snapshot.alerts.iter().map(|a| a.rule.as_str()).collect();
    assert_eq!(rules, vec!["high_error_rate", "high_overdue_rate"]);
    assert!(
        snapshot
            .alerts
            .iter()
            .all(|a| a.severity == AlertSeverity::Critical)
    );

    assert_eq!(snapshot.overview.performance.requests_total, 2);
    assert_eq!(snapshot.overview.performance.error_rate, 50.0);
    assert_eq!(snapshot.overview.performance.status, SectionStatus::Critical);
    assert_eq!(snapshot.overview.loans.status, SectionStatus::Critical);
    assert_eq!(snapshot.overview.books.status, SectionStatus::Healthy);

    assert!(!snapshot.overall_healthy);
    assert_eq!(snapshot.system_status, SystemStatus::Healthy);
    assert_eq!(snapshot.recommendations.len(), 2);
    assert!(snapshot.recommendations[0].contains("server logs"));
    assert_eq!(snapshot.system_info.environment, "integration");
}

#[tokio::test(start_paused = true)]
async fn test_cached_overview_expires_after_ttl() {
    let library = sample_library();
    let state = test_state(library.clone());

    assert_eq!(state.reporter.public_summary().await.available_books, 3);
    let first = state.reporter.overview_computed_at().await;
    assert!(first.is_some());

    library
        .update(|data| {
            for book in &mut data.books {
                book.available_copies = 0;
            }
        })
        .await;

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(state.reporter.public_summary().await.available_books, 3);
    assert_eq!(state.reporter.overview_computed_at().await, first);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(state.reporter.public_summary().await.available_books, 0);

    let snapshot = state.reporter.snapshot().await;
    assert!(
        snapshot
            .alerts
            .iter()
            .any(|a| a.rule == "low_book_availability")
    );
    assert_eq!(snapshot.overview.books.status, SectionStatus::Warning);
}

#[tokio::test]
async fn test_exporter_reflects_aggregates_and_counters() {
    let state = test_state(sample_library());
    state
        .collector
        .track_api_request("POST", 201, Duration::from_millis(15));
    state.collector.track_search_query("title", "member");
    state.collector.track_search_query("author", "student");

    let text = state.exporter.render().await.unwrap();
    assert!(text.contains("library_users_total 3"));
    assert!(text.contains("library_books_total 4"));
    assert!(text.contains("library_available_books_total 3"));
    assert!(text.contains("status_class=\"2xx\""));
    assert!(text.contains("# TYPE library_api_requests_total counter"));

    let stats = state
        .reporter
        .daily_statistics(Utc::now().date_naive())
        .await
        .unwrap();
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.total_books, 4);
    assert_eq!(stats.borrowed_books, 1);
    assert_eq!(stats.outstanding_fines, 4.5);
}

#[tokio::test]
async fn test_model_reports() {
    let state = test_state(sample_library());

    let loans = state.reporter.model_report_by_name("loans").await.unwrap();
    let json = serde_json::to_value(&loans).unwrap();
    assert_eq!(json["model"], "loans");
    assert_eq!(json["overdue_rate"], 50.0);
    assert_eq!(json["statistics"]["overdue"], 1);

    let err = state
        .reporter
        .model_report_by_name("fines")
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::UnknownModel(_)));
}
