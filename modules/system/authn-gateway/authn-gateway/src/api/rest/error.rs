//! Response shapes for rejected requests: `{ "error": <message> }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[must_use]
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

#[must_use]
pub fn unauthorized(message: impl Into<String>) -> Response {
    error_response(StatusCode::UNAUTHORIZED, message)
}

#[must_use]
pub fn forbidden(message: impl Into<String>) -> Response {
    error_response(StatusCode::FORBIDDEN, message)
}
