//! # Validation Module
//!
//! Field-level validators shared by the typed command structs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command structs (this crate)                                  │
//! │  ├── Typed fields (deserialization)                                     │
//! │  └── THIS MODULE: field/range checks via `validate()`                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (mesa-db)                                        │
//! │  └── Reference resolution, state checks, business rules                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE constraints (incl. the one-open-session partial index)      │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: validation always runs before any write              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an entity id: required, UUID format.
pub fn validate_id(field: &'static str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a valid UUID",
    })?;

    Ok(())
}

/// Validates an optional entity id (absent is fine, present must be valid).
pub fn validate_optional_id(field: &'static str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_id(field, id),
        None => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a monetary amount in cents.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: card-only or cash-only tender,
///   free items)
pub fn validate_amount_cents(field: &'static str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative { field });
    }

    Ok(())
}

/// Validates a percentage in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%). The discount ceiling from
///   Parameters is a business rule checked later, in settlement.
pub fn validate_bps(field: &'static str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field,
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection / String Validators
// =============================================================================

/// Validates the number of lines on one order.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines",
            min: 0,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a display name (room, product, customer).
pub fn validate_name(field: &'static str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required { field });
    }

    if name.len() > 150 {
        return Err(ValidationError::TooLong { field, max: 150 });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("order_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_id("order_id", "").is_err());
        assert!(validate_id("order_id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_optional_id() {
        assert!(validate_optional_id("table_id", None).is_ok());
        assert!(
            validate_optional_id("table_id", Some("550e8400-e29b-41d4-a716-446655440000")).is_ok()
        );
        assert!(validate_optional_id("table_id", Some("nope")).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents("cash", 0).is_ok());
        assert!(validate_amount_cents("cash", 110_700).is_ok());
        assert!(validate_amount_cents("cash", -1).is_err());
    }

    #[test]
    fn test_validate_bps() {
        assert!(validate_bps("discount", 0).is_ok());
        assert!(validate_bps("discount", 10000).is_ok());
        assert!(validate_bps("discount", 10001).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Terraza").is_ok());
        assert!(validate_name("name", "  ").is_err());
        assert!(validate_name("name", &"a".repeat(200)).is_err());
    }
}
