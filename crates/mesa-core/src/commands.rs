//! # Command Types
//!
//! One typed command struct per public operation. Each carries a
//! `validate()` that enforces its field-level preconditions; repositories
//! call it before touching storage, so an invalid command never mutates
//! anything.
//!
//! This replaces loosely-typed request payloads: a command that
//! deserializes and validates is structurally complete.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::settlement::{Charges, Tender};
use crate::validation::{
    validate_amount_cents, validate_bps, validate_id, validate_line_count, validate_optional_id,
    validate_quantity,
};

// =============================================================================
// Order Commands
// =============================================================================

/// A line entry on order creation or direct settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price override in cents; defaults to the product's current
    /// catalog price when absent.
    pub unit_price_cents: Option<i64>,
}

impl NewLine {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_id("product_id", &self.product_id)?;
        validate_quantity(self.quantity)?;
        if let Some(price) = self.unit_price_cents {
            validate_amount_cents("unit_price", price)?;
        }
        Ok(())
    }
}

/// Opens a tab: with or without a table, with or without initial lines.
///
/// An empty line list is the bar-tab pattern — legal because the order
/// starts OPEN and lines are added while it stays open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub user_id: String,
    pub table_id: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<NewLine>,
}

impl CreateOrder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("user_id", &self.user_id)?;
        validate_optional_id("table_id", self.table_id.as_deref())?;
        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            line.validate()?;
        }
        Ok(())
    }
}

/// Adds a product to an open order. If the order already has a line for the
/// product, quantities merge instead of creating a duplicate line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
}

impl AddLine {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("order_id", &self.order_id)?;
        validate_id("product_id", &self.product_id)?;
        validate_quantity(self.quantity)
    }
}

/// Sets the exact quantity of an existing line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLineQuantity {
    pub order_id: String,
    pub line_id: String,
    pub quantity: i64,
}

impl SetLineQuantity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("order_id", &self.order_id)?;
        validate_id("line_id", &self.line_id)?;
        validate_quantity(self.quantity)
    }
}

// =============================================================================
// Settlement Commands
// =============================================================================

/// The charge/tender terms shared by every settlement variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleTerms {
    pub customer_id: Option<String>,
    pub apply_sales_tax: bool,
    pub apply_service_tax: bool,
    /// Requested discount in basis points (1000 = 10.00%).
    pub discount_bps: u32,
    pub cash_cents: i64,
    pub card_cents: i64,
}

impl SettleTerms {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_id("customer_id", self.customer_id.as_deref())?;
        validate_bps("discount", self.discount_bps)?;
        validate_amount_cents("cash", self.cash_cents)?;
        validate_amount_cents("card", self.card_cents)
    }

    /// The charge flags for the settlement computation.
    pub fn charges(&self) -> Charges {
        Charges {
            apply_sales_tax: self.apply_sales_tax,
            apply_service_tax: self.apply_service_tax,
            discount: Percent::from_bps(self.discount_bps),
        }
    }

    /// The tender for the settlement computation.
    pub fn tender(&self) -> Tender {
        Tender {
            cash: Money::from_cents(self.cash_cents),
            card: Money::from_cents(self.card_cents),
        }
    }
}

/// Settles one order into an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleOrder {
    pub order_id: String,
    /// Explicit cashier; falls back to the order's owning user.
    pub cashier_id: Option<String>,
    pub terms: SettleTerms,
}

impl SettleOrder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("order_id", &self.order_id)?;
        validate_optional_id("cashier_id", self.cashier_id.as_deref())?;
        self.terms.validate()
    }
}

/// Settles ALL open orders of a table into one consolidated invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleTable {
    pub table_id: String,
    /// Explicit cashier; falls back to the first open order's owner.
    pub cashier_id: Option<String>,
    pub terms: SettleTerms,
}

impl SettleTable {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("table_id", &self.table_id)?;
        validate_optional_id("cashier_id", self.cashier_id.as_deref())?;
        self.terms.validate()
    }
}

/// Direct sale with no backing order (walk-up / bar sale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleDirect {
    pub cashier_id: String,
    pub lines: Vec<NewLine>,
    pub terms: SettleTerms,
}

impl SettleDirect {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("cashier_id", &self.cashier_id)?;
        if self.lines.is_empty() {
            return Err(ValidationError::Empty { field: "lines" });
        }
        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            line.validate()?;
        }
        self.terms.validate()
    }
}

// =============================================================================
// Cash Session Commands
// =============================================================================

/// Closes a cash session against the cashier's counted drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSession {
    pub session_id: String,
    pub declared_cash_cents: i64,
    pub declared_card_cents: i64,
}

impl CloseSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("session_id", &self.session_id)?;
        validate_amount_cents("declared_cash", self.declared_cash_cents)?;
        validate_amount_cents("declared_card", self.declared_card_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
