//! # Error Types
//!
//! Domain-specific error types for jazzy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  jazzy-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger / business rule failures                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  jazzy-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError for engine operations      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → HTTP adapter        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverability
//! | Variant                      | Caller action                            |
//! |------------------------------|------------------------------------------|
//! | `InsufficientStock`          | reduce the quantity                      |
//! | `InsufficientBatchInventory` | data-integrity bug, surface loudly       |
//! | `AlreadyReverted`            | treat as a no-op                         |
//! | `ProtectedStatusViolation`   | reject, never retry                      |
//! | `DuplicateIdentity`          | choose different identity fields         |

use thiserror::Error;

use crate::types::TransactionType;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger and business-rule errors.
///
/// None of these are retried by the engine: retrying a sale blindly could
/// draw stock twice, so retries belong to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No product under this composite id.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds the product's current quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 3 of 1001-GG0002-TRT-54
    ///      │
    ///      ▼
    /// currentQty = 2
    ///      │
    ///      ▼
    /// InsufficientStock { available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Dashboard shows: "Not enough stock. Only 2 available."
    /// ```
    #[error("Insufficient stock for {frame_id}: available {available}, requested {requested}")]
    InsufficientStock {
        frame_id: String,
        available: i64,
        requested: i64,
    },

    /// Open batches cannot cover a draw that the cached quantity allowed.
    ///
    /// The cached `currentQty` and the batch ledger disagree. This is never
    /// patched over with a partial cost.
    #[error(
        "Batch inventory for {frame_id} cannot cover {requested} unit(s): only {available} remain in open batches"
    )]
    InsufficientBatchInventory {
        frame_id: String,
        requested: i64,
        available: i64,
    },

    /// The write-off already has a REVERT_WRITE_OFF entry pointing at it.
    #[error("Write-off #{write_off_id} has already been reverted")]
    AlreadyReverted { write_off_id: i64 },

    /// Attempted manual assignment of a status only the engine may set.
    #[error("Status \"{status}\" is protected and is set automatically")]
    ProtectedStatusViolation { status: String },

    /// A product already exists under the requested composite id.
    #[error("A frame with ID {0} already exists")]
    DuplicateIdentity(String),

    /// No ledger entry with this id.
    #[error("Ledger entry not found: #{0}")]
    EntryNotFound(i64),

    /// The referenced ledger entry is not a write-off.
    #[error("Ledger entry #{entry_id} is {actual}, not a write-off")]
    NotAWriteOff {
        entry_id: i64,
        actual: TransactionType,
    },

    /// The referenced ledger entry belongs to another product.
    #[error("Ledger entry #{entry_id} does not belong to frame {frame_id}")]
    EntryFrameMismatch { entry_id: i64, frame_id: String },

    #[error("Status not found: {0}")]
    StatusNotFound(String),

    /// A status still referenced by products cannot be deleted.
    #[error("Status \"{name}\" is used by {product_count} product(s)")]
    StatusInUse { name: String, product_count: i64 },

    #[error("Brand not found: {0}")]
    BrandNotFound(i64),

    #[error("Company not found: {0}")]
    CompanyNotFound(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger state is read.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. illegal characters in a style number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g. duplicate status name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            frame_id: "1001-GG0002-TRT-54".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 1001-GG0002-TRT-54: available 3, requested 5"
        );

        let err = CoreError::AlreadyReverted { write_off_id: 42 };
        assert_eq!(err.to_string(), "Write-off #42 has already been reverted");

        let err = CoreError::NotAWriteOff {
            entry_id: 7,
            actual: TransactionType::Sale,
        };
        assert_eq!(err.to_string(), "Ledger entry #7 is SALE, not a write-off");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "styleNumber".to_string(),
        };
        assert_eq!(err.to_string(), "styleNumber is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
