//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//! It is the only place where the internal error taxonomy meets status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication Errors**: no credential, or one that does not resolve
/// - **Entitlement Errors**: no funding, or the daily cap is reached
/// - **Storage Errors**: any persistence failure, reported generically
/// - **Request Errors**: forbidden, unknown model, invalid input
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage failed while resolving or evaluating a request.
    ///
    /// Returns HTTP 500. Details are logged, never sent to the client.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The request carried no extractable credential.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing API key")]
    MissingCredentials,

    /// The credential is unknown, inactive, revoked, or its owner is disabled.
    ///
    /// Returns HTTP 401 Unauthorized. The cases are deliberately indistinguishable.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// No funding source currently covers the account.
    ///
    /// Returns HTTP 402 Payment Required.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Funding exists but today's spending ceiling has been reached.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Daily usage limit exceeded")]
    DailyCapExceeded,

    /// Authenticated, but not allowed to use this endpoint.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Forbidden")]
    Forbidden,

    /// Returns HTTP 404 Not Found.
    #[error("Model not found")]
    ModelNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "missing_api_key",
                self.to_string(),
            ),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::InsufficientBalance => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::DailyCapExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "daily_limit_exceeded",
                self.to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::ModelNotFound => {
                (StatusCode::NOT_FOUND, "model_not_found", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Store(ref err) => {
                tracing::error!(error = %err, "storage failure while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_taxonomy() {
        let cases = [
            (AppError::MissingCredentials, StatusCode::UNAUTHORIZED),
            (AppError::InvalidApiKey, StatusCode::UNAUTHORIZED),
            (AppError::InsufficientBalance, StatusCode::PAYMENT_REQUIRED),
            (AppError::DailyCapExceeded, StatusCode::TOO_MANY_REQUESTS),
            (
                AppError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
