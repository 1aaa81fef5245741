//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scorigami_core::error::{AggregationFailure, InvalidFilterError};
use serde_json::json;
use tracing::error;

/// Error returned by a handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<InvalidFilterError> for ApiError {
    fn from(e: InvalidFilterError) -> Self {
        ApiError::BadRequest(e.message().to_string())
    }
}

impl From<AggregationFailure> for ApiError {
    fn from(e: AggregationFailure) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => {
                error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
