use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by workflows and handlers.
///
/// Domain rejections carry a client-facing message. Infrastructure variants
/// are logged in full and reported with a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid or expired code")]
    InvalidCode,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email address is not verified")]
    EmailNotVerified,

    #[error("{0}")]
    Unauthorized(String),

    #[error("permission denied")]
    Forbidden,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("mail dispatch failed: {0}")]
    Mail(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCode => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::EmailNotVerified | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Mail(_) | AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Conflict(_) => "Conflict",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidCode => "InvalidCode",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::EmailNotVerified => "EmailNotVerified",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden => "Forbidden",
            AppError::Config(_) => "ConfigurationError",
            AppError::Mail(_) => "MailUnavailable",
            AppError::Database(_) => "StoreUnavailable",
            AppError::Internal(_) => "InternalServerError",
        }
    }

    /// Infrastructure faults a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Mail(_) | AppError::Database(_))
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Config(_) | AppError::Internal(_) => "internal server error".into(),
            AppError::Database(_) => "service temporarily unavailable".into(),
            AppError::Mail(_) => "mail service temporarily unavailable".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), "request failed");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
