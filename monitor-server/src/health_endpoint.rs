//! Liveness endpoint

use crate::server::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Liveness response
#[derive(Debug, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Handler for `/health`
///
/// Answers as long as the process serves requests; dependency health is
/// reported by the admin system snapshot instead.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.collector.uptime().as_secs(),
        version: state.reporter.version().to_string(),
    })
}
