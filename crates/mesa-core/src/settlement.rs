//! # Settlement Module
//!
//! The pure financial algorithm that turns line items into an invoice
//! breakdown. No I/O: the storage layer resolves orders and rates, calls
//! into this module, and persists the result.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Settlement Computation                              │
//! │                                                                         │
//! │  lines (1..n orders, or direct entry)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  consolidate() ── merge duplicate products, sum quantities              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  subtotal = Σ line.subtotal                                             │
//! │  tax_sales / tax_service = round2(subtotal × rate)     (if applied)     │
//! │  base = subtotal + taxes                                                │
//! │  discount = round2(base × pct)      pct > max ⇒ DiscountExceeded        │
//! │  total = base − discount                                                │
//! │  received = cash + card             total − received > 0.01             │
//! │       │                                   ⇒ InsufficientPayment         │
//! │       ▼                                                                 │
//! │  change = max(0, received − total)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rounding step is half-up to 2 decimals (`Money::percent_of`),
//! applied per step — never deferred to the end — so results are exactly
//! reproducible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::PAYMENT_TOLERANCE_CENTS;

// =============================================================================
// Inputs
// =============================================================================

/// Configured rates read from Parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rates {
    pub sales: Percent,
    pub service: Percent,
    /// Hard ceiling for the requested discount.
    pub max_discount: Percent,
}

/// Per-settlement charge flags and requested discount.
///
/// The discount is expressed in basis points (`u32`), so a negative request
/// is unrepresentable; the lower clamp of the contract is structural.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Charges {
    pub apply_sales_tax: bool,
    pub apply_service_tax: bool,
    pub discount: Percent,
}

/// Cash/card amounts presented by the customer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tender {
    pub cash: Money,
    pub card: Money,
}

impl Tender {
    /// Total amount received.
    #[inline]
    pub fn received(&self) -> Money {
        self.cash + self.card
    }
}

/// A line entering settlement: either a copy of an order line or a direct
/// entry. `subtotal_cents` is always `quantity × unit_price_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleLine {
    pub product_id: String,
    /// Product name frozen into the invoice line snapshot.
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl SettleLine {
    /// Creates a line with its subtotal computed from quantity × unit price.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Self {
        SettleLine {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_price_cents,
            subtotal_cents: quantity * unit_price_cents,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// The complete financial breakdown of one settlement.
///
/// Post-rounding identity, always:
/// `total == subtotal + tax_sales + tax_service − discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub subtotal: Money,
    pub tax_sales: Money,
    pub tax_service: Money,
    pub discount: Money,
    pub total: Money,
    pub cash: Money,
    pub card: Money,
    pub change: Money,
}

// =============================================================================
// Consolidation
// =============================================================================

/// Merges lines from one or more orders into one line per product.
///
/// Quantities for the same product are summed into a single line; the unit
/// price of the first line seen for a product wins and the subtotal is
/// recomputed from the merged quantity. Input order is preserved
/// (first-seen position), so consolidated invoices list products in the
/// order they were first rung up.
pub fn consolidate(lines: Vec<SettleLine>) -> Vec<SettleLine> {
    let mut merged: Vec<SettleLine> = Vec::with_capacity(lines.len());
    let mut index_by_product: HashMap<String, usize> = HashMap::new();

    for line in lines {
        match index_by_product.get(&line.product_id) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.quantity += line.quantity;
                existing.subtotal_cents = existing.quantity * existing.unit_price_cents;
            }
            None => {
                index_by_product.insert(line.product_id.clone(), merged.len());
                merged.push(line);
            }
        }
    }

    merged
}

// =============================================================================
// Computation
// =============================================================================

/// Runs the settlement arithmetic over already-consolidated lines.
///
/// ## Errors
/// - [`CoreError::DiscountExceeded`] if the requested discount is above
///   `rates.max_discount` (equal is allowed)
/// - [`CoreError::InsufficientPayment`] if cash + card fall more than one
///   cent short of the total; carries the shortfall in cents
///
/// Both checks run before the caller writes anything.
pub fn compute(
    lines: &[SettleLine],
    rates: Rates,
    charges: Charges,
    tender: Tender,
) -> CoreResult<Breakdown> {
    // 1. Subtotal
    let subtotal = lines
        .iter()
        .fold(Money::zero(), |acc, l| acc + Money::from_cents(l.subtotal_cents));

    // 2. Taxes, each rounded half-up independently
    let tax_sales = if charges.apply_sales_tax {
        subtotal.percent_of(rates.sales)
    } else {
        Money::zero()
    };
    let tax_service = if charges.apply_service_tax {
        subtotal.percent_of(rates.service)
    } else {
        Money::zero()
    };

    let base = subtotal + tax_sales + tax_service;

    // 3. Discount: percentage of (subtotal + taxes), ceiling-checked
    if charges.discount > rates.max_discount {
        return Err(CoreError::DiscountExceeded {
            requested_bps: charges.discount.bps(),
            max_bps: rates.max_discount.bps(),
        });
    }
    let discount = if charges.discount.is_zero() {
        Money::zero()
    } else {
        base.percent_of(charges.discount)
    };

    let total = base - discount;

    // 4. Payment validation with 1-cent rounding tolerance
    let received = tender.received();
    let shortfall = total - received;
    if shortfall.cents() > PAYMENT_TOLERANCE_CENTS {
        return Err(CoreError::InsufficientPayment {
            shortfall_cents: shortfall.cents(),
        });
    }

    // 5. Change; within-tolerance underpayment yields 0.00, never negative
    let change = (received - total).clamp_floor_zero();

    Ok(Breakdown {
        subtotal,
        tax_sales,
        tax_service,
        discount,
        total,
        cash: tender.cash,
        card: tender.card,
        change,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
