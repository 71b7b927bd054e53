//! Mapping of management errors to `{ "error": <message> }` responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ip_allowlist_sdk::AllowListError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by management handlers.
#[derive(Debug)]
pub enum ApiError {
    Domain(AllowListError),
    BadRequest(String),
}

impl From<AllowListError> for ApiError {
    fn from(e: AllowListError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Domain(e @ AllowListError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Domain(e @ AllowListError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            Self::Domain(e @ AllowListError::Conflict { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            Self::Domain(AllowListError::Unavailable(detail)) => {
                tracing::error!(error = %detail, "allow-list management request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
