use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

/// JSON error body with a single descriptive field.
///
/// Not-found cases answer with a `message` key, everything else with `error`.
/// Existing clients depend on both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    status: StatusCode,
    key: &'static str,
    text: String,
}

impl ErrorResponse {
    pub fn error(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            key: "error",
            text: text.into(),
        }
    }

    pub fn message(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            key: "message",
            text: text.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.key.to_string(), Value::String(self.text.clone()));
        Value::Object(body)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

/// Body absent, not JSON, or not a non-empty JSON object
pub fn not_json() -> ErrorResponse {
    ErrorResponse::error(StatusCode::BAD_REQUEST, "Request must be JSON")
}

/// Path did not resolve to any route
pub fn route_not_found() -> ErrorResponse {
    ErrorResponse::error(StatusCode::NOT_FOUND, "Not Found")
}

/// Id addresses no stored user
pub fn user_not_found() -> ErrorResponse {
    ErrorResponse::message(StatusCode::NOT_FOUND, "User not found")
}

/// Map domain error to its HTTP status and JSON body
pub fn map_domain_error(e: &DomainError) -> ErrorResponse {
    match e {
        DomainError::UserNotFound { .. } => user_not_found(),
        DomainError::NoUsers => ErrorResponse::message(StatusCode::NOT_FOUND, "No users to delete"),
        DomainError::AlreadyExists => ErrorResponse::error(
            StatusCode::CONFLICT,
            "Username or email already exists",
        ),
        DomainError::MissingFields => {
            ErrorResponse::error(StatusCode::BAD_REQUEST, "Missing username or email")
        }
        DomainError::InvalidField { .. } => {
            ErrorResponse::error(StatusCode::BAD_REQUEST, "Invalid username or email")
        }
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            ErrorResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
