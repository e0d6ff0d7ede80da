//! Error handling for ClubHub
//!
//! This module defines the error taxonomy shared by every engine and the
//! mapping from that taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Main error type for ClubHub
#[derive(Error, Debug)]
pub enum ClubHubError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Event {event_id} is a paid event; complete checkout instead")]
    PaymentRequired { event_id: uuid::Uuid },

    #[error("Already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Payment verification failed")]
    PaymentVerification,

    #[error("Malformed QR payload: {0}")]
    MalformedQr(String),

    #[error("QR code is invalid or no longer valid")]
    InvalidQr,

    #[error("Attendance already marked")]
    AlreadyMarked,

    #[error("{service} request failed: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias for ClubHub operations
pub type Result<T> = std::result::Result<T, ClubHubError>;

impl From<config::ConfigError> for ClubHubError {
    fn from(err: config::ConfigError) -> Self {
        ClubHubError::Config(err.to_string())
    }
}

impl ClubHubError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ClubHubError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        ClubHubError::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Check if retrying the same request could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClubHubError::Upstream { .. } => true,
            ClubHubError::Http(_) => true,
            ClubHubError::Io(_) => true,
            ClubHubError::Database(_) => false,
            ClubHubError::Migration(_) => false,
            ClubHubError::Config(_) => false,
            ClubHubError::Serialization(_) => false,
            ClubHubError::Jwt(_) => false,
            ClubHubError::Validation(_)
            | ClubHubError::Unauthenticated(_)
            | ClubHubError::Authorization(_)
            | ClubHubError::Conflict(_)
            | ClubHubError::NotFound { .. }
            | ClubHubError::PaymentRequired { .. }
            | ClubHubError::AlreadyCompleted(_)
            | ClubHubError::PaymentVerification
            | ClubHubError::MalformedQr(_)
            | ClubHubError::InvalidQr
            | ClubHubError::AlreadyMarked => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClubHubError::Database(_) => ErrorSeverity::Critical,
            ClubHubError::Migration(_) => ErrorSeverity::Critical,
            ClubHubError::Config(_) => ErrorSeverity::Critical,
            ClubHubError::PaymentVerification => ErrorSeverity::Warning,
            ClubHubError::InvalidQr => ErrorSeverity::Warning,
            ClubHubError::Authorization(_) => ErrorSeverity::Warning,
            ClubHubError::Unauthenticated(_) => ErrorSeverity::Warning,
            ClubHubError::Jwt(_) => ErrorSeverity::Warning,
            ClubHubError::Validation(_) => ErrorSeverity::Info,
            ClubHubError::MalformedQr(_) => ErrorSeverity::Info,
            ClubHubError::Conflict(_) => ErrorSeverity::Info,
            ClubHubError::AlreadyMarked => ErrorSeverity::Info,
            ClubHubError::AlreadyCompleted(_) => ErrorSeverity::Info,
            ClubHubError::NotFound { .. } => ErrorSeverity::Info,
            ClubHubError::PaymentRequired { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status code this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClubHubError::Validation(_) => StatusCode::BAD_REQUEST,
            ClubHubError::MalformedQr(_) => StatusCode::BAD_REQUEST,
            ClubHubError::PaymentVerification => StatusCode::BAD_REQUEST,
            ClubHubError::Unauthenticated(_) | ClubHubError::Jwt(_) => StatusCode::UNAUTHORIZED,
            ClubHubError::Authorization(_) => StatusCode::FORBIDDEN,
            ClubHubError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClubHubError::Conflict(_)
            | ClubHubError::AlreadyMarked
            | ClubHubError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            ClubHubError::InvalidQr => StatusCode::UNPROCESSABLE_ENTITY,
            ClubHubError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ClubHubError::Upstream { .. } | ClubHubError::Http(_) => StatusCode::BAD_GATEWAY,
            ClubHubError::Database(_)
            | ClubHubError::Migration(_)
            | ClubHubError::Config(_)
            | ClubHubError::Serialization(_)
            | ClubHubError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            ClubHubError::Validation(_) => "VALIDATION_ERROR",
            ClubHubError::Unauthenticated(_) | ClubHubError::Jwt(_) => "UNAUTHENTICATED",
            ClubHubError::Authorization(_) => "FORBIDDEN",
            ClubHubError::Conflict(_) => "CONFLICT",
            ClubHubError::NotFound { .. } => "NOT_FOUND",
            ClubHubError::PaymentRequired { .. } => "PAYMENT_REQUIRED",
            ClubHubError::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            ClubHubError::PaymentVerification => "PAYMENT_VERIFICATION_FAILED",
            ClubHubError::MalformedQr(_) => "MALFORMED_QR",
            ClubHubError::InvalidQr => "INVALID_QR",
            ClubHubError::AlreadyMarked => "ALREADY_MARKED",
            ClubHubError::Upstream { .. } | ClubHubError::Http(_) => "UPSTREAM_ERROR",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Collaborator and infrastructure internals are never echoed back.
    pub fn public_message(&self) -> String {
        match self {
            ClubHubError::Upstream { service, .. } => format!("{} is unavailable, try again later", service),
            ClubHubError::Http(_) => "An upstream service is unavailable, try again later".to_string(),
            ClubHubError::Jwt(_) => "Invalid or expired token".to_string(),
            ClubHubError::Database(_)
            | ClubHubError::Migration(_)
            | ClubHubError::Config(_)
            | ClubHubError::Serialization(_)
            | ClubHubError::Io(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Error response body (JSON)
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ClubHubError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(status = %status, code = self.code(), error = %self, "Request failed");
            }
            ErrorSeverity::Warning => {
                tracing::warn!(status = %status, code = self.code(), error = %self, "Request rejected");
            }
            ErrorSeverity::Info => {
                tracing::debug!(status = %status, code = self.code(), error = %self, "Request rejected");
            }
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
