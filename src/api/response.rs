//! Response types for the clinic billing API.
//!
//! This module defines the error response structures and the mapping from
//! [`EngineError`] to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::EncounterTotals;
use crate::voucher::ValidationResult;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
            EngineError::InvalidLineItem { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INVALID_LINE_ITEM",
                    message,
                    "The line item contains out-of-range values",
                ),
            ),
            EngineError::InvalidEncounter { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INVALID_ENCOUNTER",
                    message,
                    "The encounter contains out-of-range values",
                ),
            ),
            EngineError::InvalidInput { .. } => {
                Self::new(StatusCode::BAD_REQUEST, ApiError::validation_error(message))
            }
            EngineError::NotFound { entity, .. } => Self::new(
                StatusCode::NOT_FOUND,
                ApiError::new(format!("{}_NOT_FOUND", entity.to_uppercase()), message),
            ),
            EngineError::VoucherRejected { reason } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new(reason.code(), reason.to_string()),
            ),
            EngineError::DuplicateVoucherCode { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::new("DUPLICATE_VOUCHER_CODE", message),
            ),
            EngineError::WriteConflict { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::with_details("WRITE_CONFLICT", message, "Reload and try again"),
            ),
            EngineError::RedemptionConflict { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::with_details("REDEMPTION_CONFLICT", message, "Try the redemption again"),
            ),
            EngineError::Persistence { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::with_details(
                    "PERSISTENCE_ERROR",
                    "Storage is temporarily unavailable",
                    message,
                ),
            ),
            EngineError::Cancelled { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::with_details("SERVICE_UNAVAILABLE", "Server is shutting down", message),
            ),
        }
    }
}

/// Response body for the `/encounter-totals` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsResponse {
    /// The encounter totals, adjusted by the voucher if one applied.
    #[serde(flatten)]
    pub totals: EncounterTotals,
    /// The voucher check, if a code was supplied.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub voucher: Option<ValidationResult>,
}
