//! Application error types
//!
//! Two error families cross the HTTP boundary: [`AppError`] for handler
//! failures and [`AuthError`] for authentication middleware failures.
//! Both convert into JSON responses so no error ever escapes as a panic
//! or a bare status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::core::tts::TtsError;
use crate::usage::LedgerError;

/// Result type for request handlers
pub type AppResult<T> = Result<T, AppError>;

/// Errors produced by request handlers
#[derive(Error, Debug)]
pub enum AppError {
    /// Request failed validation before any provider call
    #[error("{0}")]
    Validation(String),

    /// Caller is not authenticated for this endpoint
    #[error("Unauthorized")]
    Unauthorized,

    /// The synthesis provider rejected or failed the request
    #[error("{0}")]
    Provider(String),

    /// The usage ledger failed
    #[error("{0}")]
    Ledger(String),
}

impl From<TtsError> for AppError {
    fn from(err: TtsError) -> Self {
        AppError::Provider(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            AppError::Provider(message) | AppError::Ledger(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced by the authentication middleware
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Authentication configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let response = AppError::Validation("Text is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_errors_map_to_500() {
        let response = AppError::Provider("polly unavailable".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn auth_errors_map_to_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::ConfigError("no secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
