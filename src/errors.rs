use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::UserId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is not valid json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store returned inconsistent data: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("{0}")]
    Validation(String),

    #[error("ledger for user {0} was modified concurrently, retry the operation")]
    ConcurrencyConflict(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email {0} is already registered")]
    EmailTaken(String),

    #[error("no user matches {0}")]
    NotFound(String),

    #[error("bearer token is not recognised")]
    InvalidToken,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT '{value}': {source}")]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("invalid STORE_TIMEOUT_MS '{0}', expected a positive number of milliseconds")]
    InvalidStoreTimeout(String),

    #[error("invalid LEDGER_UTC_OFFSET_MINUTES '{0}'")]
    InvalidUtcOffset(String),

    #[error("{0}")]
    InvalidWeeklyWindow(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        error!(error = %err, "internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if !matches!(err, StoreError::Timeout(_) | StoreError::Io(_)) {
            return Self::internal(err);
        }
        error!(error = %err, "store unavailable");
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "calorie store unavailable, try again".into(),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "user not found".into(),
            },
            LedgerError::Validation(message) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message,
            },
            LedgerError::ConcurrencyConflict(user_id) => Self {
                status: StatusCode::CONFLICT,
                message: LedgerError::ConcurrencyConflict(user_id).to_string(),
            },
            LedgerError::Store(err) => err.into(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken(_) => Self {
                status: StatusCode::CONFLICT,
                message: "email already registered".into(),
            },
            AccountError::NotFound(_) => Self::not_found("user not found"),
            AccountError::InvalidToken => Self::unauthorized("invalid or expired token"),
            AccountError::Validation(message) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message,
            },
            AccountError::Store(err) => err.into(),
        }
    }
}

/// Malformed or mistyped request bodies keep the JSON error shape.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "code": self.status.as_u16(),
            }
        });
        (self.status, Json(body)).into_response()
    }
}
