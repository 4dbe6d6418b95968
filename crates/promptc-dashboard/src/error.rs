//! Error types for the dashboard crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur in the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Failed to bind or serve.
    #[error("failed to start dashboard on {addr}: {source}")]
    StartupFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
