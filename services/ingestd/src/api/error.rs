//! API error type and helpers.
//!
//! Centralizes HTTP error construction so every endpoint returns the same
//! `{code, message}` shape with a status code matching the category.
//! Internal failures log details server-side and return a generic message.
use crate::api::types::ErrorResponse;
use crate::registry::RegistryError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Structured API error: an HTTP status plus the JSON error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn build(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

/// 404 with code `not_found`.
pub fn api_not_found(message: &str) -> ApiError {
    build(StatusCode::NOT_FOUND, "not_found", message)
}

/// 409 with a caller-provided conflict code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    build(StatusCode::CONFLICT, code, message)
}

/// 400 with code `validation_error`.
pub fn api_validation_error(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 401 with code `unauthorized`.
pub fn api_unauthorized(message: &str) -> ApiError {
    build(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// 403 with code `forbidden`.
pub fn api_forbidden(message: &str) -> ApiError {
    build(StatusCode::FORBIDDEN, "forbidden", message)
}

/// 500 with code `internal`. Logs the underlying error server-side and
/// keeps the client message generic.
pub fn api_internal(message: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "ingestd internal error");
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Translate a registry failure into the matching HTTP error.
pub fn from_registry_error(err: RegistryError) -> ApiError {
    match err {
        RegistryError::NotFound(id) => api_not_found(&format!("channel {id} not found")),
        RegistryError::Conflict(id) => {
            api_conflict("already_exists", &format!("channel {id} already exists"))
        }
        RegistryError::Unexpected(inner) => api_internal("registry unavailable", inner),
    }
}
