//! # Database Error Types
//!
//! Error types for storage operations, plus the combined error every
//! repository operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← constraint classification, pool, migration     │
//! │       │                                                                 │
//! │       ├── CoreError (mesa-core) ← domain failures join here             │
//! │       ▼        │                                                        │
//! │  PosError ◄────┘  ← what repositories return                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  REST layer maps to status codes (out of scope)                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A PersistenceError (DbError) inside a transaction rolls the whole
//! transaction back: the `Transaction` guard rolls back on drop unless
//! explicitly committed.

use thiserror::Error;

use mesa_core::{CoreError, ValidationError};

// =============================================================================
// DbError
// =============================================================================

/// Storage operation errors.
///
/// These wrap sqlx errors and classify SQLite constraint violations so
/// callers can react (e.g. map the one-open-session unique index to a
/// state conflict).
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation.
    #[error("Duplicate {field}: value already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Checks whether this error is a unique-constraint violation on the
    /// given column (table.column as SQLite reports it).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field } if field.contains(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint class
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
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

/// Result type for low-level database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// PosError
// =============================================================================

/// The combined error type every repository operation returns: either a
/// domain failure (validation, not-found, state conflict, business rule)
/// or a persistence failure.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl PosError {
    /// Checks if this is a domain not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PosError::Domain(CoreError::NotFound { .. }))
    }
}

impl From<sqlx::Error> for PosError {
    fn from(err: sqlx::Error) -> Self {
        PosError::Storage(DbError::from(err))
    }
}

impl From<ValidationError> for PosError {
    fn from(err: ValidationError) -> Self {
        PosError::Domain(CoreError::Validation(err))
    }
}

/// Result type for repository operations.
pub type PosResult<T> = Result<T, PosError>;

/// Shorthand for the ubiquitous "referenced entity does not resolve"
/// failure.
pub fn not_found(entity: &'static str, id: impl Into<String>) -> PosError {
    PosError::Domain(CoreError::not_found(entity, id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let err = DbError::UniqueViolation {
            field: "cash_sessions.cashier_id".to_string(),
        };
        assert!(err.is_unique_violation_on("cashier_id"));
        assert!(!err.is_unique_violation_on("order_id"));
    }

    #[test]
    fn test_validation_promotes_to_domain_error() {
        let err: PosError = ValidationError::Required { field: "user_id" }.into();
        assert!(matches!(
            err,
            PosError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_not_found_helper() {
        let err: PosError = CoreError::not_found("order", "o-1").into();
        assert!(err.is_not_found());

        let err: PosError = DbError::PoolExhausted.into();
        assert!(!err.is_not_found());
    }
}
