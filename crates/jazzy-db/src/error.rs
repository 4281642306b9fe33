//! # Database Error Types
//!
//! Error types for database operations and engine operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Ledger rule (jazzy_core::CoreError)│
//! │       │                                     │                           │
//! │       ▼                                     │                           │
//! │  DbError ← adds categorization              │                           │
//! │       │                                     │                           │
//! │       └──────────────┬──────────────────────┘                           │
//! │                      ▼                                                  │
//! │               EngineError  (InventoryEngine results)                    │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │         HTTP adapter maps to status codes and messages                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use jazzy_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate composite id, status name or company name
    /// - A second REVERT_WRITE_OFF for one write-off
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Frame referencing a missing brand or status
    /// - Brand referencing a missing company
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative quantity, overdrawn batch, ...).
    ///
    /// The engine validates before writing, so this means a bug upstream.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The write lock could not be taken within the busy timeout.
    #[error("Database is busy")]
    Busy,

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for a unique violation on `table.column`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.ends_with(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound            → DbError::NotFound
/// sqlx::Error::Database (by kind)     → Unique / ForeignKey / Check violation
/// "database is locked"                → DbError::Busy
/// sqlx::Error::PoolTimedOut           → DbError::PoolExhausted
/// Other                               → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: <table>.<column>"
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: msg
                            .split("UNIQUE constraint failed: ")
                            .nth(1)
                            .unwrap_or("unknown")
                            .to_string(),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message: msg },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message: msg },
                    _ if msg.contains("database is locked") => DbError::Busy,
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Failure of an [`InventoryEngine`](crate::engine::InventoryEngine) operation.
///
/// Either a ledger rule refused the intent, or the store failed. In both
/// cases the unit of work was rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// The ledger rule that refused the operation, if any.
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            EngineError::Db(_) => None,
        }
    }

    /// Errors the caller can fix by changing the request.
    pub fn is_user_error(&self) -> bool {
        match self {
            EngineError::Core(CoreError::InsufficientBatchInventory { .. }) => false,
            EngineError::Core(_) => true,
            EngineError::Db(_) => false,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_column_match() {
        let err = DbError::duplicate("inventory_transactions.reverted_from_id", "9");
        assert!(err.is_unique_violation_on("reverted_from_id"));
        assert!(!err.is_unique_violation_on("composite_id"));
    }

    #[test]
    fn test_engine_error_classification() {
        let err: EngineError = CoreError::InsufficientStock {
            frame_id: "1001-GG0002-TRT-54".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert!(err.is_user_error());
        assert!(err.core().is_some());

        let err: EngineError = CoreError::InsufficientBatchInventory {
            frame_id: "1001-GG0002-TRT-54".to_string(),
            requested: 2,
            available: 1,
        }
        .into();
        assert!(!err.is_user_error());

        let err: EngineError = DbError::PoolExhausted.into();
        assert!(err.core().is_none());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
