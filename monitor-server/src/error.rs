//! Error types for the monitoring HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use libris_monitor_core::MonitorError;
use thiserror::Error;
use tracing::error;

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned by monitoring handlers
#[derive(Debug, Error)]
pub enum ServerError {
    /// Caller is anonymous, invalid or lacks an administrative role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Monitoring core failure
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a bad request error
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Self::BadRequest(msg.into())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Monitor(MonitorError::UnknownModel(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Monitor(MonitorError::Source(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Monitor(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Monitoring request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_monitor_core::SourceError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::forbidden("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::Monitor(MonitorError::UnknownModel("fines".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Monitor(SourceError::Unavailable("down".into()).into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServerError::Monitor(MonitorError::computation("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::bad_request("date").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_message_passes_through_monitor_errors() {
        let err = ServerError::from(MonitorError::UnknownModel("fines".into()));
        assert_eq!(err.to_string(), "Unknown model: fines");
    }
}
