//! Object API error types.
//!
//! Every error is rendered as
//! `{"error": {"code": ..., "message": ..., "status": ..., "details": ...}}`
//! with `details` null unless the error carries diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ObjectsErrorCode {
    /// Malformed request, including malformed signature headers.
    #[default]
    BadRequest,
    /// Missing, unknown or invalid credentials.
    Unauthorized,
    /// Unknown route or object.
    NotFound,
    /// Operational fault.
    InternalError,
}

impl ObjectsErrorCode {
    /// Returns the wire code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InternalError => "internal_error",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::BadRequest => http::StatusCode::BAD_REQUEST,
            Self::Unauthorized => http::StatusCode::UNAUTHORIZED,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a status code to its wire code.
    #[must_use]
    pub fn from_status(status: http::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Unauthorized,
            404 | 405 => Self::NotFound,
            500..=599 => Self::InternalError,
            _ => Self::BadRequest,
        }
    }
}

impl fmt::Display for ObjectsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object API error response.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectsError {
    /// The error code.
    pub code: ObjectsErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// Optional diagnostic details.
    pub details: Option<Value>,
}

impl fmt::Display for ObjectsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectsError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ObjectsError {}

impl ObjectsError {
    /// Create a new `ObjectsError` from an error code.
    #[must_use]
    pub fn new(code: ObjectsErrorCode) -> Self {
        Self::with_message(code, default_message(code))
    }

    /// Create a new `ObjectsError` with a custom message.
    #[must_use]
    pub fn with_message(code: ObjectsErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            details: None,
        }
    }

    /// Attach diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    // -- Convenience constructors --

    /// Malformed request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ObjectsErrorCode::BadRequest, message)
    }

    /// Body failed validation.
    #[must_use]
    pub fn invalid_request(errors: Vec<Value>) -> Self {
        Self::with_message(ObjectsErrorCode::BadRequest, "Invalid request")
            .with_details(serde_json::json!({ "errors": errors }))
    }

    /// Credentials missing or rejected.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(ObjectsErrorCode::Unauthorized, message)
    }

    /// Object or route not found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ObjectsErrorCode::NotFound, message)
    }

    /// Internal server error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ObjectsErrorCode::InternalError, message)
    }

    /// Unknown route.
    #[must_use]
    pub fn unknown_route(method: &http::Method, path: &str) -> Self {
        Self::not_found("Not Found")
            .with_details(serde_json::json!({ "method": method.as_str(), "path": path }))
    }

    /// Wire envelope for this error.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code.as_str().to_owned(),
                message: self.message.clone(),
                status: self.status_code.as_u16(),
                details: self.details.clone(),
            },
        }
    }
}

fn default_message(code: ObjectsErrorCode) -> &'static str {
    match code {
        ObjectsErrorCode::BadRequest => "Bad request",
        ObjectsErrorCode::Unauthorized => "Unauthorized",
        ObjectsErrorCode::NotFound => "Not Found",
        ObjectsErrorCode::InternalError => "Internal server error",
    }
}

/// Top-level error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error.
    pub error: ErrorBody,
}

/// Error fields of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP status duplicated for convenience.
    pub status: u16,
    /// Diagnostics, or null.
    pub details: Option<Value>,
}
