//! Error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type surfaced to callers. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. [`BackendError`] and [`PublishError`] are the error types of
//! the two external collaborators.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "service not found: go.micro.service.greeter",
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
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Facade error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No queried domain holds a matching service.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A backend call or subscription setup failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// Writing to an open watch stream failed.
    #[error("stream error: {0}")]
    Stream(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ServiceNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Stream(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) | Self::Stream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for [`GatewayError::ServiceNotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound(_))
    }
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Errors reported by a registry backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The domain holds no matching record.
    #[error("not found")]
    NotFound,

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend failed while serving the request.
    #[error("backend error: {0}")]
    Internal(String),
}

/// Errors reported by an event publisher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The publish attempt did not finish within its time budget.
    #[error("publish timed out")]
    Timeout,

    /// The publisher is shut down.
    #[error("publisher closed")]
    Closed,

    /// The transport refused the event.
    #[error("publish rejected: {0}")]
    Rejected(String),
}
