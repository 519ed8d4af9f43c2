//! End-to-end scenarios over a live monitoring server

use crate::test_utils::*;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

async fn admin_get(client: &reqwest::Client, url: String) -> reqwest::Response {
    client
        .get(url)
        .header("x-api-key", ADMIN_KEY)
        .send()
        .await
        .expect("request sent")
}

async fn public_summary(client: &reqwest::Client, server: &LiveServer) -> Value {
    client
        .get(server.url("/api/analytics/public-dashboard/"))
        .send()
        .await
        .expect("request sent")
        .json()
        .await
        .expect("summary JSON")
}

#[tokio::test]
async fn test_operator_session() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let client = reqwest::Client::new();

    let liveness: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liveness["status"], "healthy");

    let snapshot: Value = admin_get(&client, server.url("/api/analytics/monitor/system/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["system_status"], "healthy");
    assert_eq!(snapshot["overall_healthy"], false);
    assert_eq!(snapshot["overview"]["users"]["total"], 3);
    assert_eq!(snapshot["overview"]["loans"]["status"], "critical");
    assert_eq!(snapshot["alerts"][0]["rule"], "high_overdue_rate");
    assert_eq!(snapshot["system_info"]["environment"], "integration");

    let response = admin_get(&client, server.url("/api/analytics/dashboard/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Library Monitoring"));
    assert!(html.contains("high_overdue_rate"));

    let response = admin_get(
        &client,
        server.url("/api/analytics/monitor/daily/?date=2024-02-29"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let daily: Value = response.json().await.unwrap();
    assert_eq!(daily["date"], "2024-02-29");
    assert_eq!(daily["total_books"], 4);

    let collector = server.state.collector.clone();
    wait_for_condition(
        || {
            let collector = collector.clone();
            async move { collector.api_requests() >= 3 }
        },
        Duration::from_secs(2),
        Duration::from_millis(20),
    )
    .await
    .unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_library_changes_visible_after_refresh() {
    let library = sample_library();
    let server = LiveServer::start(test_state(library.clone())).await;
    let client = reqwest::Client::new();

    assert_eq!(public_summary(&client, &server).await["available_books"], 3);

    library
        .update(|data| {
            for book in &mut data.books {
                book.available_copies = book.total_copies;
            }
        })
        .await;
    assert_eq!(public_summary(&client, &server).await["available_books"], 3);

    server.state.reporter.refresh().await;
    let summary = public_summary(&client, &server).await;
    assert_eq!(summary["available_books"], 4);
    assert_eq!(summary["total_books"], 4);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_outage_and_recovery_without_refresh() {
    let library = sample_library();
    let server = LiveServer::start(test_state(library.clone())).await;
    let client = reqwest::Client::new();

    library.set_available(false);

    let snapshot: Value = admin_get(&client, server.url("/api/analytics/monitor/system/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["system_status"], "degraded");
    assert_eq!(snapshot["overall_healthy"], false);
    assert_eq!(snapshot["probes"]["database"], false);
    assert_eq!(snapshot["probes"]["cache"], true);
    assert_eq!(snapshot["overview"]["users"]["status"], "unknown");

    let response = admin_get(&client, server.url("/api/analytics/monitor/books/")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let liveness = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(liveness.status(), StatusCode::OK);

    // no refresh: neither a failed overview nor a failed probe round is cached
    library.set_available(true);

    let snapshot: Value = admin_get(&client, server.url("/api/analytics/monitor/system/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["system_status"], "healthy");
    assert_eq!(snapshot["probes"]["database"], true);
    assert_eq!(snapshot["overview"]["users"]["total"], 3);

    let response = admin_get(&client, server.url("/api/analytics/monitor/books/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let url = server.url("/health");
    let client = reqwest::Client::new();

    assert!(client.get(&url).send().await.is_ok());
    server.stop().await.unwrap();

    let fresh = reqwest::Client::new();
    assert!(fresh.get(&url).send().await.is_err());
}
