//! Error types for the clinic billing engine.
//!
//! Pricing rules are total functions and never fail, and voucher validation
//! reports rejections as data. This module covers everything else: bad
//! configuration, out-of-range input at the service boundary, and failures
//! talking to the key-value store.

use thiserror::Error;

use crate::voucher::RejectionReason;

/// The main error type for the clinic billing engine.
///
/// # Example
///
/// ```
/// use clinic_billing::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/clinic.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/clinic.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A treatment or medication line item was out of range.
    #[error("Invalid line item '{item_id}': {message}")]
    InvalidLineItem {
        /// The ID of the offending line item.
        item_id: String,
        /// A description of what made the item invalid.
        message: String,
    },

    /// An encounter-level field was out of range.
    #[error("Invalid encounter field '{field}': {message}")]
    InvalidEncounter {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A directory or voucher field was out of range.
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A record looked up by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record (e.g. "patient", "voucher").
        entity: String,
        /// The id that was looked up.
        id: String,
    },

    /// A redemption failed its in-transaction eligibility check.
    #[error("Voucher rejected: {reason}")]
    VoucherRejected {
        /// Why the voucher could not be redeemed.
        reason: RejectionReason,
    },

    /// A voucher code is already taken by another voucher.
    #[error("Voucher code already exists: {code}")]
    DuplicateVoucherCode {
        /// The normalised (uppercase) code.
        code: String,
    },

    /// A conditional write lost against a concurrent writer.
    #[error("Write conflict on key '{key}'")]
    WriteConflict {
        /// The key whose precondition failed.
        key: String,
    },

    /// Redemption kept losing optimistic-concurrency races.
    #[error("Voucher '{voucher_id}' is being redeemed concurrently; gave up after {attempts} attempts")]
    RedemptionConflict {
        /// The contested voucher.
        voucher_id: String,
        /// How many attempts were made.
        attempts: u32,
    },

    /// The key-value store could not be reached or rejected the request.
    #[error("Persistence error: {message}")]
    Persistence {
        /// A description of the storage failure.
        message: String,
    },

    /// An operation was abandoned because its cancellation token fired.
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },
}

impl EngineError {
    /// Shorthand for [`EngineError::NotFound`].
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// Shorthand for [`EngineError::InvalidInput`].
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Persistence { .. }
                | EngineError::Cancelled { .. }
                | EngineError::WriteConflict { .. }
                | EngineError::RedemptionConflict { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
