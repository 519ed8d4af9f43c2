//! Integration tests for admin authorization over a live server

use crate::test_utils::*;
use libris_monitor_server::{JwtClaims, TokenValidator};
use reqwest::StatusCode;

const ADMIN_PATHS: [&str; 6] = [
    "/api/analytics/monitor/system/",
    "/api/analytics/monitor/users/",
    "/api/analytics/monitor/books/",
    "/api/analytics/monitor/daily/",
    "/api/analytics/dashboard/",
    "/metrics",
];

async fn get_with(
    client: &reqwest::Client,
    url: String,
    header: Option<(&str, String)>,
) -> StatusCode {
    let mut request = client.get(url);
    if let Some((name, value)) = header {
        request = request.header(name, value);
    }
    request.send().await.expect("request sent").status()
}

fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

#[tokio::test]
async fn test_anonymous_callers_reach_only_public_endpoints() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let client = reqwest::Client::new();

    for path in ADMIN_PATHS {
        let status = get_with(&client, server.url(path), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
    }
    for path in ["/health", "/api/analytics/public-dashboard/"] {
        let status = get_with(&client, server.url(path), None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_api_key_header_forms() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let client = reqwest::Client::new();
    let url = || server.url("/api/analytics/monitor/system/");

    let forms = [
        ("x-api-key", ADMIN_KEY.to_string()),
        ("authorization", format!("ApiKey {ADMIN_KEY}")),
        ("authorization", format!("Bearer {ADMIN_KEY}")),
    ];
    for (name, value) in forms {
        let status = get_with(&client, url(), Some((name, value.clone()))).await;
        assert_eq!(status, StatusCode::OK, "{name}: {value}");
    }

    let reader = get_with(&client, url(), Some(("x-api-key", READER_KEY.to_string()))).await;
    assert_eq!(reader, StatusCode::FORBIDDEN);

    let unknown = get_with(&client, url(), Some(("x-api-key", "lm_unknown".to_string()))).await;
    assert_eq!(unknown, StatusCode::FORBIDDEN);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_jwt_roles_and_claims() {
    let state = test_state(sample_library());
    let validator = state.auth.token_validator().expect("jwt enabled");
    let server = LiveServer::start(state.clone()).await;
    let client = reqwest::Client::new();
    let url = || server.url("/metrics");

    let librarian = validator
        .create_token(
            &JwtClaims::new("u-1", "libris", "libris-monitor", 600)
                .with_roles(vec!["librarian".to_string()]),
        )
        .unwrap();
    let status = get_with(&client, url(), Some(bearer(&librarian))).await;
    assert_eq!(status, StatusCode::OK);

    let staff = validator
        .create_token(&JwtClaims::new("u-2", "libris", "libris-monitor", 600).with_staff(true))
        .unwrap();
    let status = get_with(&client, url(), Some(bearer(&staff))).await;
    assert_eq!(status, StatusCode::OK);

    let lecturer = validator
        .create_token(
            &JwtClaims::new("u-3", "libris", "libris-monitor", 600)
                .with_roles(vec!["teacher".to_string()]),
        )
        .unwrap();
    let status = get_with(&client, url(), Some(bearer(&lecturer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let foreign = TokenValidator::new(JWT_SECRET, "elsewhere", "libris-monitor")
        .create_token(
            &JwtClaims::new("u-4", "elsewhere", "libris-monitor", 600)
                .with_roles(vec!["admin".to_string()]),
        )
        .unwrap();
    let status = get_with(&client, url(), Some(bearer(&foreign))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_authorization_precedes_model_lookup() {
    let server = LiveServer::start(test_state(sample_library())).await;
    let client = reqwest::Client::new();
    let url = || server.url("/api/analytics/monitor/fines/");

    assert_eq!(get_with(&client, url(), None).await, StatusCode::FORBIDDEN);
    assert_eq!(
        get_with(&client, url(), Some(("x-api-key", ADMIN_KEY.to_string()))).await,
        StatusCode::NOT_FOUND
    );

    server.stop().await.unwrap();
}
