//! Caller-facing errors for the order engine.
//!
//! Layer errors (`OrderError`, `QuotaError`) are folded into an
//! [`EngineError`] carrying a stable [`ErrorCode`] before they leave the
//! HTTP API.
//!
//! # HTTP Status Codes
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `INVALID_REQUEST` | 400 | Malformed query or limit configuration |
//! | `INVALID_ORDER` | 400 | Submission failed validation |
//! | `FORBIDDEN` | 403 | Caller does not own the order |
//! | `ORDER_NOT_FOUND` | 404 | Unknown order id |
//! | `CANNOT_CANCEL` | 409 | Order is submitting or terminal |
//! | `STALE_STATE` | 409 | Concurrent change won the race |
//! | `QUOTA_EXCEEDED` | 422 | Hard quota limit would be exceeded |
//! | `INTERNAL_ERROR` | 500 | Storage or unexpected failure |

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order_management::OrderError;
use crate::domain::quota::QuotaError;

/// Stable error codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request outside order validation.
    InvalidRequest,
    /// Order parameters failed validation.
    InvalidOrder,
    /// Order not found.
    OrderNotFound,
    /// Order cannot be cancelled in its current status.
    CannotCancel,
    /// Caller does not own the order.
    Forbidden,
    /// Hard quota limit exceeded.
    QuotaExceeded,
    /// Lost a compare-and-swap.
    StaleState,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::InvalidOrder => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::CannotCancel | Self::StaleState => StatusCode::CONFLICT,
            Self::QuotaExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidOrder => "INVALID_ORDER",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::CannotCancel => "CANNOT_CANCEL",
            Self::Forbidden => "FORBIDDEN",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::StaleState => "STALE_STATE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// An error with a caller-facing code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct EngineError {
    code: ErrorCode,
    message: String,
}

impl EngineError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Malformed request.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// JSON body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code,
            message: self.message.clone(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        let code = match &err {
            OrderError::InvalidOrder { .. } => ErrorCode::InvalidOrder,
            OrderError::NotFound { .. } => ErrorCode::OrderNotFound,
            OrderError::NotOwner { .. } => ErrorCode::Forbidden,
            OrderError::CannotCancel { .. } => ErrorCode::CannotCancel,
            OrderError::StaleState { .. }
            | OrderError::InvalidStateTransition { .. }
            | OrderError::AlreadyCompleted { .. }
            | OrderError::AttemptInFlight { .. } => ErrorCode::StaleState,
            OrderError::AttemptNotFound { .. }
            | OrderError::AttemptNotInFlight { .. }
            | OrderError::OccurrenceConflict { .. }
            | OrderError::Storage(_) => ErrorCode::InternalError,
        };
        Self::new(code, err.to_string())
    }
}

impl From<QuotaError> for EngineError {
    fn from(err: QuotaError) -> Self {
        let code = match &err {
            QuotaError::Exceeded { .. } => ErrorCode::QuotaExceeded,
            QuotaError::InvalidAmount(_) | QuotaError::InvalidLimit(_) => {
                ErrorCode::InvalidRequest
            }
            QuotaError::Storage(_) => ErrorCode::InternalError,
        };
        Self::new(code, err.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, message = %self.message, "Request rejected");
        }
        (status, Json(self.to_body())).into_response()
    }
}
