//! Router tests for the monitoring API

#[cfg(test)]
mod tests {
    use crate::auth::{ApiKeyEntry, AuthConfig, JwtClaims};
    use crate::server::{AppState, create_router};
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use libris_monitor_core::{InMemoryLibrary, MonitoringConfig};
    use serde_json::{Value, json};
    use std::io::Write;
    use std::sync::Arc;

    const ADMIN_KEY: &str = "lm_admin_key";
    const MEMBER_KEY: &str = "lm_member_key";
    const SECRET: &str = "router-test-secret";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            api_keys: vec![
                ApiKeyEntry {
                    key: ADMIN_KEY.to_string(),
                    user: "ops".to_string(),
                    roles: vec!["librarian".to_string()],
                },
                ApiKeyEntry {
                    key: MEMBER_KEY.to_string(),
                    user: "reader".to_string(),
                    roles: vec!["member".to_string()],
                },
            ],
            ..AuthConfig::default()
        }
    }

    fn library_json() -> Value {
        let recent = (Utc::now() - Duration::days(1)).to_rfc3339();
        let today = Utc::now().date_naive();
        json!({
            "users": [
                {"username": "ada", "role": "member", "account_status": "active",
                 "is_fully_verified": true, "date_joined": "2023-01-01T00:00:00Z",
                 "last_login": recent},
                {"username": "bob", "role": "student", "account_status": "active",
                 "is_fully_verified": true, "date_joined": "2023-01-01T00:00:00Z"}
            ],
            "books": [
                {"title": "Dune", "category": "Fiction", "total_copies": 2, "available_copies": 1},
                {"title": "SICP", "category": "Computing", "total_copies": 1, "available_copies": 1}
            ],
            "loans": [
                {"user_id": "6f1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "book_id": "7a1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "loan_date": (today - Duration::days(3)).to_string(),
                 "due_date": (today + Duration::days(11)).to_string(),
                 "status": "active"}
            ]
        })
    }

    struct Harness {
        server: TestServer,
        state: Arc<AppState>,
        library: Arc<InMemoryLibrary>,
    }

    async fn harness() -> Harness {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(library_json().to_string().as_bytes()).unwrap();
        let library = Arc::new(InMemoryLibrary::from_json_file(file.path()).await.unwrap());

        let state = Arc::new(
            AppState::new(
                &MonitoringConfig::default(),
                &auth_config(),
                "test",
                library.clone(),
            )
            .unwrap(),
        );
        let server = TestServer::new(create_router(state.clone())).unwrap();
        Harness {
            server,
            state,
            library,
        }
    }

    fn api_key(key: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(key).unwrap(),
        )
    }

    fn bearer(token: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_liveness_is_public() {
        let h = harness().await;
        let response = h.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn test_public_dashboard_without_credentials() {
        let h = harness().await;
        let response = h.server.get("/api/analytics/public-dashboard/").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["total_users"], 2);
        assert_eq!(body["total_books"], 2);
        assert_eq!(body["available_books"], 2);
        assert_eq!(body["active_loans"], 1);
        assert!(body.get("overdue").is_none());
    }

    #[tokio::test]
    async fn test_admin_routes_reject_anonymous_and_non_admin() {
        let h = harness().await;
        let (name, value) = api_key(MEMBER_KEY);
        let (bad_name, bad_value) = api_key("lm_unknown");

        for path in [
            "/api/analytics/monitor/system/",
            "/api/analytics/monitor/books/",
            "/api/analytics/monitor/fines/",
            "/api/analytics/monitor/daily/",
            "/api/analytics/dashboard/",
            "/metrics",
        ] {
            let anonymous = h.server.get(path).await;
            assert_eq!(anonymous.status_code(), StatusCode::FORBIDDEN, "{path}");
            let body: Value = anonymous.json();
            assert!(body["error"].as_str().unwrap().starts_with("Forbidden"));
            assert!(body.get("overview").is_none());

            let member = h
                .server
                .get(path)
                .add_header(name.clone(), value.clone())
                .await;
            assert_eq!(member.status_code(), StatusCode::FORBIDDEN, "{path}");

            let invalid = h
                .server
                .get(path)
                .add_header(bad_name.clone(), bad_value.clone())
                .await;
            assert_eq!(invalid.status_code(), StatusCode::FORBIDDEN, "{path}");
        }
    }

    #[tokio::test]
    async fn test_system_snapshot_for_admin() {
        let h = harness().await;
        let (name, value) = api_key(ADMIN_KEY);
        let response = h
            .server
            .get("/api/analytics/monitor/system/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["overview"]["users"]["total"], 2);
        assert_eq!(body["overview"]["users"]["activity_rate"], 50.0);
        assert_eq!(body["probes"]["database"], true);
        assert_eq!(body["probes"]["cache"], true);
        assert_eq!(body["system_status"], "healthy");
        assert_eq!(body["system_info"]["environment"], "test");
        assert!(body["alerts"].is_array());
    }

    #[tokio::test]
    async fn test_authorization_header_forms() {
        let h = harness().await;

        let response = h
            .server
            .get("/api/analytics/monitor/system/")
            .add_header(
                HeaderName::from_static("authorization"),
                HeaderValue::from_str(&format!("ApiKey {ADMIN_KEY}")).unwrap(),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let validator = h.state.auth.token_validator().unwrap();
        let staff = JwtClaims::new("u-1", "libris", "libris-monitor", 600).with_staff(true);
        let (name, value) = bearer(&validator.create_token(&staff).unwrap());
        let response = h
            .server
            .get("/api/analytics/monitor/system/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let student = JwtClaims::new("u-2", "libris", "libris-monitor", 600)
            .with_roles(vec!["student".to_string()]);
        let (name, value) = bearer(&validator.create_token(&student).unwrap());
        let response = h
            .server
            .get("/api/analytics/monitor/system/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_model_reports() {
        let h = harness().await;
        let (name, value) = api_key(ADMIN_KEY);

        for model in ["users", "books", "loans", "analytics"] {
            let response = h
                .server
                .get(&format!("/api/analytics/monitor/{model}/"))
                .add_header(name.clone(), value.clone())
                .await;
            assert_eq!(response.status_code(), StatusCode::OK, "{model}");
            let body: Value = response.json();
            assert_eq!(body["model"], model);
            assert!(body["health"]["status"].is_string());
        }

        let response = h
            .server
            .get("/api/analytics/monitor/fines/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "Unknown model: fines");
    }

    #[tokio::test]
    async fn test_daily_statistics() {
        let h = harness().await;
        let (name, value) = api_key(ADMIN_KEY);

        let response = h
            .server
            .get("/api/analytics/monitor/daily/")
            .add_query_param("date", "2024-03-01")
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["date"], "2024-03-01");
        assert_eq!(body["total_users"], 2);
        assert_eq!(body["total_books"], 2);

        let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
        let response = h
            .server
            .get("/api/analytics/monitor/daily/")
            .add_header(name.clone(), value.clone())
            .await;
        let body: Value = response.json();
        assert_eq!(body["date"], yesterday);

        let response = h
            .server
            .get("/api/analytics/monitor/daily/")
            .add_query_param("date", "yesterday")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let h = harness().await;
        let (name, value) = api_key(ADMIN_KEY);

        let response = h.server.get("/metrics").add_header(name, value).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response.header("content-type"),
            HeaderValue::from_static("text/plain; version=0.0.4")
        );
        let text = response.text();
        assert!(text.contains("library_users_total 2"));
        assert!(text.contains("library_books_total 2"));
        assert!(text.contains("# TYPE library_api_requests_total counter"));
    }

    #[tokio::test]
    async fn test_admin_html_dashboard() {
        let h = harness().await;
        let (name, value) = api_key(ADMIN_KEY);

        let response = h
            .server
            .get("/api/analytics/dashboard/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Library Monitoring"));
        assert!(html.contains("scrape interval 30s"));
        assert!(html.contains("<td>books</td>"));
    }

    #[tokio::test]
    async fn test_api_requests_are_tracked() {
        let h = harness().await;
        assert_eq!(h.state.collector.api_requests(), 0);

        h.server.get("/health").await;
        h.server.get("/api/analytics/public-dashboard/").await;
        h.server.get("/api/analytics/monitor/system/").await;

        assert_eq!(h.state.collector.api_requests(), 2);
        assert_eq!(
            h.state.collector.counter_value(
                "library_api_requests_total",
                &[("method", "GET"), ("status_class", "4xx")]
            ),
            Some(1)
        );
        assert_eq!(
            h.state.collector.counter_value(
                "library_api_requests_total",
                &[("method", "GET"), ("status_class", "2xx")]
            ),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_unavailable_source_degrades_instead_of_failing() {
        let h = harness().await;
        h.library.set_available(false);
        let (name, value) = api_key(ADMIN_KEY);

        let response = h
            .server
            .get("/api/analytics/monitor/system/")
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["probes"]["database"], false);
        assert_eq!(body["system_status"], "degraded");
        assert_eq!(body["overall_healthy"], false);
        assert_eq!(body["overview"]["users"]["status"], "unknown");

        let response = h
            .server
            .get("/api/analytics/monitor/users/")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
