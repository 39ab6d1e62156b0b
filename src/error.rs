//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{AmountError, IbanError, PhoneError};
use crate::ledger::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No active main account")]
    NoMainAccount,

    #[error("Source and destination account are the same")]
    SelfTransfer,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Missing or invalid credentials")]
    Unauthenticated,

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Admin role required")]
    AdminRequired,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No user registered with phone {0}")]
    PhoneNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Loan has already been decided")]
    LoanAlreadyDecided,

    #[error("Card limit reached: {0}")]
    CardLimitReached(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    // Validation errors from domain primitives
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Iban(#[from] IbanError),

    #[error(transparent)]
    Phone(#[from] PhoneError),

    // Ledger errors carry their own taxonomy
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::NoMainAccount => (StatusCode::BAD_REQUEST, "no_main_account", None),
            AppError::SelfTransfer => (StatusCode::BAD_REQUEST, "self_transfer", None),
            AppError::InsufficientBalance => {
                (StatusCode::BAD_REQUEST, "insufficient_balance", None)
            }
            AppError::Amount(e) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", Some(e.to_string()))
            }
            AppError::Iban(e) => (StatusCode::BAD_REQUEST, "invalid_iban", Some(e.to_string())),
            AppError::Phone(e) => {
                (StatusCode::BAD_REQUEST, "invalid_phone", Some(e.to_string()))
            }

            // 401 Unauthorized
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            AppError::BadCredentials => (StatusCode::UNAUTHORIZED, "bad_credentials", None),

            // 403 Forbidden
            AppError::AdminRequired => (StatusCode::FORBIDDEN, "admin_required", None),

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }
            AppError::PhoneNotFound(phone) => {
                (StatusCode::NOT_FOUND, "phone_not_found", Some(phone.clone()))
            }
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }
            AppError::LoanNotFound(id) => {
                (StatusCode::NOT_FOUND, "loan_not_found", Some(id.clone()))
            }
            AppError::CardNotFound(id) => {
                (StatusCode::NOT_FOUND, "card_not_found", Some(id.clone()))
            }
            AppError::NotificationNotFound(id) => {
                (StatusCode::NOT_FOUND, "notification_not_found", Some(id.clone()))
            }

            // 409 Conflict
            AppError::LoanAlreadyDecided => {
                (StatusCode::CONFLICT, "loan_already_decided", None)
            }
            AppError::CardLimitReached(msg) => {
                (StatusCode::CONFLICT, "card_limit_reached", Some(msg.clone()))
            }
            AppError::DuplicateUser(msg) => {
                (StatusCode::CONFLICT, "duplicate_user", Some(msg.clone()))
            }

            // Ledger errors map onto the same taxonomy
            AppError::Ledger(ledger_err) => match ledger_err {
                LedgerError::AccountNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "account_not_found",
                    Some(id.to_string()),
                ),
                LedgerError::AccountNotActive(id) => (
                    StatusCode::BAD_REQUEST,
                    "account_not_active",
                    Some(id.to_string()),
                ),
                LedgerError::InsufficientBalance { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_balance",
                    Some(ledger_err.to_string()),
                ),
                LedgerError::SameAccount => (StatusCode::BAD_REQUEST, "self_transfer", None),
                LedgerError::Database(e) => {
                    tracing::error!("Ledger database error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
            },

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        // Never leak server-side details to the client
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
