//! API error handling.
//!
//! Every failure leaves the service as `{path, message, messages?}`.
//! `messages` is present only for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::service::{FieldViolation, ItemError};

/// Message of every validation failure.
pub const INVALID_REQUEST: &str = "Invalid Request";

/// Message returned for store failures; details only go to the log.
pub const INTERNAL_ERROR: &str = "An internal error occurred";

// =============================================================================
// API Error
// =============================================================================

/// API error structure for JSON responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Request path that failed.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
    /// Field-level errors rendered as `field: 'reason'`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
}

impl ApiError {
    /// Creates a new API error with an empty path.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
            messages: None,
        }
    }

    /// Creates a validation error with field-level details.
    #[must_use]
    pub fn validation(details: &[FieldError]) -> Self {
        Self {
            path: String::new(),
            message: INVALID_REQUEST.to_string(),
            messages: Some(details.iter().map(ToString::to_string).collect()),
        }
    }
}

/// Field-level error for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field that failed validation.
    pub field: String,
    /// Error message for this field.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: '{}'", self.field, self.message)
    }
}

impl From<FieldViolation> for FieldError {
    fn from(violation: FieldViolation) -> Self {
        Self::new(violation.field, violation.reason)
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error details.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Creates a 400 Bad Request response for validation errors.
    #[must_use]
    pub fn validation_error(details: &[FieldError]) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::validation(details))
    }

    /// Creates a 404 Not Found response.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new(message))
    }

    /// Creates a 409 Conflict response.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiError::new(message))
    }

    /// Creates a 500 Internal Server Error response.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new(INTERNAL_ERROR),
        )
    }

    /// Sets the request path reported in the body.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.error.path = path.into();
        self
    }

    /// Converts a service error for the request at `path`, logging everything
    /// except validation failures.
    #[must_use]
    pub fn from_item_error(error: ItemError, path: &str) -> Self {
        match &error {
            ItemError::InvalidRequest(_) => {}
            ItemError::Store(cause) => {
                tracing::error!(path, error = %cause, "Store failure");
            }
            other => {
                tracing::error!(path, error = %other, "Request rejected");
            }
        }
        Self::from(error).at(path)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<ItemError> for ApiErrorResponse {
    fn from(error: ItemError) -> Self {
        let message = error.to_string();
        match error {
            ItemError::InvalidRequest(violations) => {
                let details: Vec<FieldError> =
                    violations.into_iter().map(FieldError::from).collect();
                Self::validation_error(&details)
            }
            ItemError::NotFound(_) => Self::not_found(message),
            ItemError::ActionNotAllowed { .. } | ItemError::Conflict(_) => Self::conflict(message),
            // Internal errors should not expose details to clients.
            ItemError::Store(_) => Self::internal_error(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Request validation failure raised by the adapter before the service runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field-level errors.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub const fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Creates a validation error with a single field error.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, message)])
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(error: ValidationError) -> Self {
        Self::validation_error(&error.errors)
    }
}

// =============================================================================
// Tests
// =============================================================================
