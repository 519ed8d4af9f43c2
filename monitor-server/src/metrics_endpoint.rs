//! Prometheus scrape endpoint

use crate::server::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use libris_monitor_core::exporter::CONTENT_TYPE;
use std::sync::Arc;
use tracing::error;

/// Handler for `/metrics`
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.exporter.render().await {
        Ok(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            metrics,
        )
            .into_response(),
        Err(e) => {
            error!("Error rendering metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {e}"),
            )
                .into_response()
        }
    }
}
