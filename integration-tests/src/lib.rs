//! Integration tests for the Libris monitoring crates
//!
//! These tests run the monitoring core, the HTTP server and the CLI
//! together over real sockets and real files.

#![allow(unused_imports)] // Allow unused imports in integration tests
#![cfg_attr(not(test), allow(dead_code))]
#![allow(clippy::uninlined_format_args)] // Allow traditional format strings in tests

pub mod auth_server_integration;
pub mod cli_server_integration;
pub mod end_to_end_scenarios;
pub mod monitoring_integration;

/// Common test utilities for integration tests
pub mod test_utils {
    use chrono::{Duration as ChronoDuration, Utc};
    use libris_monitor_core::{InMemoryLibrary, LibraryData, MonitoringConfig};
    use libris_monitor_server::{
        ApiKeyEntry, AppState, AuthConfig, ServerResult, create_router, serve,
    };
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    /// API key with an admin role in [`test_auth_config`]
    pub const ADMIN_KEY: &str = "lm_integration_admin";
    /// API key with a non-admin role in [`test_auth_config`]
    pub const READER_KEY: &str = "lm_integration_reader";
    /// JWT secret in [`test_auth_config`]
    pub const JWT_SECRET: &str = "integration-secret";

    /// Auth config with one admin key, one reader key and JWT enabled
    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: Some(JWT_SECRET.to_string()),
            api_keys: vec![
                ApiKeyEntry {
                    key: ADMIN_KEY.to_string(),
                    user: "ops".to_string(),
                    roles: vec!["admin".to_string()],
                },
                ApiKeyEntry {
                    key: READER_KEY.to_string(),
                    user: "reader".to_string(),
                    roles: vec!["student".to_string()],
                },
            ],
            ..AuthConfig::default()
        }
    }

    /// A small library: 3 users, 4 titles, 2 open loans of which 1 is overdue
    pub fn sample_library_json() -> Value {
        let recent = (Utc::now() - ChronoDuration::days(2)).to_rfc3339();
        let today = Utc::now().date_naive();
        json!({
            "users": [
                {"username": "ada", "role": "librarian", "account_status": "active",
                 "is_fully_verified": true, "date_joined": "2022-05-01T00:00:00Z",
                 "last_login": recent},
                {"username": "bea", "role": "member", "account_status": "active",
                 "is_fully_verified": true, "date_joined": "2023-02-11T00:00:00Z",
                 "last_login": recent},
                {"username": "cal", "role": "student", "account_status": "active",
                 "is_fully_verified": true, "date_joined": "2023-09-01T00:00:00Z"}
            ],
            "books": [
                {"title": "Dune", "category": "Fiction",
                 "total_copies": 3, "available_copies": 2},
                {"title": "SICP", "category": "Computing",
                 "total_copies": 1, "available_copies": 0},
                {"title": "Emma", "category": "Fiction",
                 "total_copies": 2, "available_copies": 2},
                {"title": "Cosmos", "category": "Science",
                 "total_copies": 1, "available_copies": 1}
            ],
            "loans": [
                {"user_id": "6f1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "book_id": "7a1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "loan_date": (today - ChronoDuration::days(4)).to_string(),
                 "due_date": (today + ChronoDuration::days(10)).to_string(),
                 "status": "active"},
                {"user_id": "8b1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "book_id": "9c1c2b52-0a55-4b8e-9a55-1a2b3c4d5e6f",
                 "loan_date": (today - ChronoDuration::days(30)).to_string(),
                 "due_date": (today - ChronoDuration::days(16)).to_string(),
                 "status": "overdue", "fine_amount": 4.5}
            ]
        })
    }

    /// The sample library as an in-memory source
    pub fn sample_library() -> Arc<InMemoryLibrary> {
        let data: LibraryData =
            serde_json::from_value(sample_library_json()).expect("sample library parses");
        Arc::new(InMemoryLibrary::new(data))
    }

    /// Write the sample library to a temporary JSON file
    pub fn sample_library_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), sample_library_json().to_string()).expect("write library");
        file
    }

    /// Handler state over `library` with the test auth config
    pub fn test_state(library: Arc<InMemoryLibrary>) -> Arc<AppState> {
        Arc::new(
            AppState::new(
                &MonitoringConfig::default(),
                &test_auth_config(),
                "integration",
                library,
            )
            .expect("state builds"),
        )
    }

    /// Monitoring API served on an ephemeral local port
    pub struct LiveServer {
        pub addr: SocketAddr,
        pub state: Arc<AppState>,
        shutdown: Option<oneshot::Sender<()>>,
        handle: JoinHandle<ServerResult<()>>,
    }

    impl LiveServer {
        /// Start serving `state` on 127.0.0.1 with an OS-assigned port
        pub async fn start(state: Arc<AppState>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("local addr");
            let (tx, rx) = oneshot::channel::<()>();

            let router = create_router(state.clone());
            let handle = tokio::spawn(serve(listener, router, async {
                let _ = rx.await;
            }));

            Self {
                addr,
                state,
                shutdown: Some(tx),
                handle,
            }
        }

        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        pub fn base_url(&self) -> String {
            format!("http://{}", self.addr)
        }

        /// Signal shutdown and wait for the server task to finish
        pub async fn stop(mut self) -> ServerResult<()> {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
            self.handle.await.expect("server task panicked")
        }
    }

    /// Wait for a condition with timeout
    pub async fn wait_for_condition<F, Fut>(
        mut condition: F,
        timeout_duration: Duration,
        check_interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout_duration {
            if condition().await {
                return Ok(());
            }
            tokio::time::sleep(check_interval).await;
        }
        Err("Condition timeout".into())
    }
}
