//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type for the tracker. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The schedule and streak calculators never produce errors; everything here
//! comes from the surrounding I/O (chain reads, storage, notifications).

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid collector: not-a-wallet",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`ServiceError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
/// | 5000–5999 | Upstream        | 502 Bad Gateway           |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The collector identifier is neither a hex address nor an ENS name.
    #[error("invalid collector: {0}")]
    InvalidCollector(String),

    /// An ENS name did not resolve to an address.
    #[error("ens name not resolved: {0}")]
    EnsNotResolved(String),

    /// A required setting is missing (home collector, notifier keys, ...).
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Every RPC endpoint failed or a contract call reverted.
    #[error("chain error: {0}")]
    Chain(String),

    /// Notification delivery failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Missing or wrong bearer token on a cron endpoint.
    #[error("unauthorized")]
    Unauthorized,

    /// Client exceeded rate limit.
    #[error("rate limit exceeded; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Milliseconds until the client may retry.
        retry_after_ms: u64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCollector(_) => 1002,
            Self::EnsNotResolved(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::NotConfigured(_) => 3002,
            Self::Chain(_) => 5001,
            Self::Notification(_) => 5002,
            Self::Unauthorized => 401,
            Self::RateLimited { .. } => 429,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCollector(_) => StatusCode::BAD_REQUEST,
            Self::EnsNotResolved(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::NotConfigured(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Chain(_) | Self::Notification(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after_secs = match &self {
            Self::RateLimited { retry_after_ms } => Some(retry_after_ms.div_ceil(1000)),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
