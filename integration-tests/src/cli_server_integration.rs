//! Integration tests for CLI and server interaction

use crate::test_utils::*;
use libris_monitor_cli::collect::{self, CollectMode};
use libris_monitor_cli::commands::build_state;
use libris_monitor_cli::selftest::{SelfTest, SelfTestPlan};
use libris_monitor_cli::{AppConfig, CliError};
use std::time::Duration;

fn config_for(data: &std::path::Path) -> AppConfig {
    AppConfig::from_toml_str(&format!(
        r#"
[server]
bind = "127.0.0.1:0"
environment = "staging"

[[auth.api_keys]]
key = "{ADMIN_KEY}"
user = "ops"
roles = ["librarian"]

[data]
path = "{}"
"#,
        data.display()
    ))
    .expect("config parses")
}

#[tokio::test]
async fn test_self_test_passes_against_live_server() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let test = SelfTest::new(&server.base_url(), ADMIN_KEY, Duration::from_secs(5)).unwrap();

    let report = test.run(SelfTestPlan::everything()).await;
    let failures: Vec<_> = report.failures().collect();
    assert!(failures.is_empty(), "failed checks: {failures:?}");
    assert_eq!(report.checks.len(), 12);

    let mut out = Vec::new();
    report.write_to(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[PASS] admin gate: anonymous request rejected"));
    assert!(text.contains("[PASS] /api/analytics/monitor/books/"));
    assert!(text.ends_with("12 checks, 12 passed, 0 failed\n"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_self_test_with_non_admin_key() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let test = SelfTest::new(&server.base_url(), READER_KEY, Duration::from_secs(5)).unwrap();

    let plan = SelfTestPlan {
        basic: true,
        ..SelfTestPlan::default()
    };
    let report = test.run(plan).await;
    assert_eq!(report.checks.len(), 4);
    assert!(!report.passed());

    let failed: Vec<&str> = report.failures().map(|c| c.name.as_str()).collect();
    assert_eq!(failed, vec!["system health"]);
    assert!(report.failures().all(|c| c.detail.contains("403")));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_self_test_requests_are_tracked() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let test = SelfTest::new(&server.base_url(), ADMIN_KEY, Duration::from_secs(5)).unwrap();

    let plan = SelfTestPlan {
        basic: true,
        ..SelfTestPlan::default()
    };
    assert!(test.run(plan).await.passed());

    // public dashboard, anonymous system request and authorized system request
    let collector = server.state.collector.clone();
    assert_eq!(collector.api_requests(), 3);
    assert_eq!(
        collector.counter_value(
            "library_api_requests_total",
            &[("method", "GET"), ("status_class", "4xx")]
        ),
        Some(1)
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_collect_from_config_file() {
    let data = sample_library_file();
    let config = config_for(data.path());
    assert_eq!(config.server.environment, "staging");

    let state = build_state(&config, &config.data.path).await.unwrap();

    let mut out = Vec::new();
    let ok = collect::run(&state.reporter, CollectMode::All { force: true }, &mut out)
        .await
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(ok, "{text}");
    assert!(text.contains("users: 3 total, 2 active (66.67%)"));
    assert!(text.contains("books: 4 total, 3 available (75.00%)"));
    assert!(text.contains("loans: 2 active, 1 overdue (50.00%)"));

    let mut out = Vec::new();
    let ok = collect::run(&state.reporter, CollectMode::HealthCheck, &mut out)
        .await
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(!ok);
    assert!(text.contains("System problems detected (healthy)"));
    assert!(text.contains("[critical] high_overdue_rate"));
}

#[tokio::test]
async fn test_collect_with_missing_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("absent.json"));

    let err = build_state(&config, &config.data.path).await.unwrap_err();
    assert!(matches!(err, CliError::Configuration(_)));
    assert!(err.to_string().contains("absent.json"));
}
