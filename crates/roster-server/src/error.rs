//! Application error types and Axum response conversion.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_core::{parse_path_code, CodeRule, ValidationError, Violation};
use serde::Serialize;
use tracing::error;

use crate::db::StoreError;

/// Application-level errors with HTTP status code mapping.
#[derive(Debug)]
pub enum AppError {
    /// One or more request violations, reported together.
    Validation(Vec<Violation>),
    /// Storage failure. The message is what the caller sees; details stay in the log.
    Internal(String),
}

impl AppError {
    /// Logs a storage failure and hides it behind a fixed message.
    pub fn storage(message: &str, err: StoreError) -> Self {
        error!("{}: {}", message, err);
        AppError::Internal(message.to_string())
    }

    /// An unreadable body on a keyed route, reported alongside any path-code violations.
    pub fn unreadable_body(code: &str, rule: CodeRule, rejection: JsonRejection) -> Self {
        let mut violations = parse_path_code(code, rule)
            .err()
            .map(|e| e.violations)
            .unwrap_or_default();
        violations.push(Violation::unreadable_body(rejection.body_text()));
        AppError::Validation(violations)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ValidationResponse {
    errors: Vec<Violation>,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.violations)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![Violation::unreadable_body(rejection.body_text())])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(ValidationResponse { errors })).into_response();
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
