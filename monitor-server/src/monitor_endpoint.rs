//! Administrative monitoring endpoints under `/api/analytics/monitor/`

use crate::error::{ServerError, ServerResult};
use crate::server::AppState;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::get,
};
use chrono::{Duration, NaiveDate, Utc};
use libris_monitor_core::{DailyStatistics, HealthSnapshot, ModelReport};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters of the daily statistics endpoint
#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    /// `YYYY-MM-DD`; yesterday when absent
    pub date: Option<String>,
}

/// Handler for `/api/analytics/monitor/system/`
pub async fn system_handler(State(state): State<Arc<AppState>>) -> Json<HealthSnapshot> {
    Json(state.reporter.snapshot().await)
}

/// Handler for `/api/analytics/monitor/:model/`
pub async fn model_handler(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
) -> ServerResult<Json<ModelReport>> {
    let report = state.reporter.model_report_by_name(&model).await?;
    Ok(Json(report))
}

/// Handler for `/api/analytics/monitor/daily/`
pub async fn daily_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DailyQuery>,
) -> ServerResult<Json<DailyStatistics>> {
    let date = parse_date(query.date.as_deref())?;
    let stats = state.reporter.daily_statistics(date).await?;
    Ok(Json(stats))
}

fn parse_date(raw: Option<&str>) -> ServerResult<NaiveDate> {
    match raw {
        None => Ok(Utc::now().date_naive() - Duration::days(1)),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ServerError::bad_request(format!("invalid date '{raw}', expected YYYY-MM-DD"))
        }),
    }
}

/// Monitoring routes; callers wrap them in admin authorization
pub fn monitor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/monitor/system/", get(system_handler))
        .route("/api/analytics/monitor/daily/", get(daily_handler))
        .route("/api/analytics/monitor/:model/", get(model_handler))
}
