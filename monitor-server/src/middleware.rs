//! Axum middleware for admin authorization and request tracking

use crate::auth::Authenticator;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use libris_monitor_core::MetricCollector;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Paths below this prefix are counted as API requests
pub const API_PREFIX: &str = "/api/";

/// Reject callers that are not administrators with `403 Forbidden`
///
/// On success the resolved [`crate::auth::AuthContext`] is inserted into
/// the request extensions.
pub async fn require_admin(
    State(auth): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.authorize_admin(request.headers()) {
        Ok(context) => {
            debug!(
                "Authorized {} for {} as {}",
                request.method(),
                request.uri().path(),
                context.user_id
            );
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            warn!(
                "Rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                e
            );
            e.into_response()
        }
    }
}

/// Record method, status class and duration of every `/api/` request
pub async fn track_requests(
    State(collector): State<Arc<MetricCollector>>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with(API_PREFIX) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    collector.track_api_request(method.as_str(), response.status().as_u16(), start.elapsed());
    response
}
