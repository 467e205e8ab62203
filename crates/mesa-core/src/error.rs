//! # Error Types
//!
//! Domain-specific error types for mesa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mesa-core errors (this file)                                           │
//! │  ├── CoreError        - Not-found, state-conflict, business-rule        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  mesa-db errors (separate crate)                                        │
//! │  ├── DbError          - Persistence failures (constraints, pool, ...)   │
//! │  └── PosError         - CoreError | DbError, returned by repositories   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PosError → REST layer → caller     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include corrective context in error values (shortfall, allowed max, id)
//! 3. Errors are enum variants, never String
//! 4. Validation and business-rule failures happen before any write

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors: unresolved references, illegal state transitions and
/// broken business rules.
///
/// These carry enough context for the caller to correct its input without
/// re-reading system state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist (or is inactive).
    ///
    /// ## When This Occurs
    /// - Order/product/table/session/invoice id does not resolve
    /// - Product was deactivated (soft delete)
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The cashier already has an open cash session.
    #[error("Cashier {cashier_id} already has an open cash session")]
    SessionAlreadyOpen { cashier_id: String },

    /// The cash session was already closed.
    #[error("Cash session {session_id} is already closed")]
    SessionAlreadyClosed { session_id: String },

    /// The order is not OPEN, so it cannot be mutated or settled.
    ///
    /// Status transitions are one-way: OPEN→INVOICED or OPEN→CANCELLED.
    #[error("Order {order_id} is {status}, expected open")]
    OrderNotOpen { order_id: String, status: String },

    /// The invoice was already voided.
    #[error("Invoice {invoice_id} is already void")]
    InvoiceAlreadyVoid { invoice_id: String },

    /// An optimistic version check failed: another transaction consumed the
    /// entity first. The caller must re-read state before retrying.
    #[error("{entity} {id} was modified concurrently")]
    VersionConflict { entity: &'static str, id: String },

    /// A line-level operation targeted a line owned by a different order.
    #[error("Line {line_id} does not belong to order {order_id}")]
    LineNotInOrder { line_id: String, order_id: String },

    /// The cashier could not be resolved, neither explicitly nor from the
    /// order's owning user.
    #[error("Cannot determine the cashier for this settlement")]
    CashierUnresolved,

    /// The requested discount exceeds the configured maximum.
    #[error("Discount {requested_bps} bps exceeds the maximum of {max_bps} bps")]
    DiscountExceeded { requested_bps: u32, max_bps: u32 },

    /// Cash + card do not cover the invoice total (beyond the 1-cent
    /// rounding tolerance). Carries the missing amount in cents.
    #[error("Insufficient payment: {shortfall_cents} cents short of the total")]
    InsufficientPayment { shortfall_cents: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a VersionConflict error.
    pub fn version_conflict(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::VersionConflict {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a command doesn't meet its preconditions. Used for
/// early validation before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: &'static str },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// A collection that must not be empty is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: &'static str },
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
        let err = CoreError::InsufficientPayment {
            shortfall_cents: 700,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: 700 cents short of the total"
        );

        let err = CoreError::DiscountExceeded {
            requested_bps: 2500,
            max_bps: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Discount 2500 bps exceeds the maximum of 1000 bps"
        );
    }

    #[test]
    fn test_not_found_helper() {
        let err = CoreError::not_found("order", "abc-123");
        assert_eq!(err.to_string(), "order not found: abc-123");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required { field: "user_id" };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
