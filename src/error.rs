//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::domain::LedgerError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Message shown for any failure whose cause stays in the logs
const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error("Session missing or expired")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    // Layer errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    /// Transfer result code, for ledger failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

            // 404 Not Found
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", Some(what.clone())),

            AppError::Ledger(err) => match err {
                LedgerError::InvalidAmount(e) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(e.to_string()))
                }
                LedgerError::InvalidAccountId(id) => {
                    (StatusCode::BAD_REQUEST, "invalid_account_id", Some(id.to_string()))
                }
                LedgerError::SameAccount => (StatusCode::BAD_REQUEST, "same_account_transfer", None),
                LedgerError::AccountNotFound(id) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
                }
                LedgerError::TransactionNotFound(id) => {
                    (StatusCode::NOT_FOUND, "transaction_not_found", Some(id.to_string()))
                }
                LedgerError::InsufficientFunds { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "insufficient_funds",
                    Some(err.to_string()),
                ),
                LedgerError::Store(e) => {
                    tracing::error!(error = %e, "Ledger store failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
                LedgerError::Timeout => {
                    tracing::error!("Ledger operation timed out");
                    (StatusCode::INTERNAL_SERVER_ERROR, "operation_timeout", None)
                }
            },

            AppError::Auth(err) => match err {
                AuthError::InvalidRegistration(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_registration", Some(msg.clone()))
                }
                AuthError::AlreadyRegistered => (StatusCode::CONFLICT, "already_registered", None),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
                }
                AuthError::InvalidPin => (StatusCode::BAD_REQUEST, "invalid_pin", None),
                AuthError::Store(e) => {
                    tracing::error!(error = %e, "Identity store failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
            },

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.status_and_code();

        let error = if status.is_server_error() {
            UNAVAILABLE_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        let code = match &self {
            AppError::Ledger(err) => Some(err.code().as_u8()),
            _ => None,
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ledger_status_mapping() {
        let cases = [
            (LedgerError::SameAccount, StatusCode::BAD_REQUEST, "same_account_transfer"),
            (LedgerError::AccountNotFound(4), StatusCode::NOT_FOUND, "account_not_found"),
            (
                LedgerError::insufficient_funds(dec!(150), dec!(100)),
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
            ),
            (LedgerError::Timeout, StatusCode::INTERNAL_SERVER_ERROR, "operation_timeout"),
        ];

        for (err, status, code) in cases {
            let (actual_status, actual_code, _) = AppError::Ledger(err).status_and_code();
            assert_eq!(actual_status, status);
            assert_eq!(actual_code, code);
        }
    }

    #[test]
    fn test_auth_status_mapping() {
        let (status, code, _) = AppError::Auth(AuthError::AlreadyRegistered).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "already_registered");

        let (status, _, _) = AppError::Auth(AuthError::InvalidCredentials).status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_store_failure_hides_cause() {
        let response =
            AppError::Store(StoreError::Unavailable("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
