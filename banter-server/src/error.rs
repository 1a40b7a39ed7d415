//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Request-level errors mapped onto HTTP status codes
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid request field
    #[error("{0}")]
    Validation(String),

    /// Unknown session id
    #[error("{0}")]
    NotFound(String),

    /// Upstream call failed before streaming began
    #[error("Upstream error: {0}")]
    Upstream(#[from] banter_relay::RelayError),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(#[from] banter_store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
