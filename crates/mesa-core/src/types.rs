//! # Domain Types
//!
//! Core domain types used throughout Mesa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Floor            Catalog            Sales                Cash          │
//! │  ─────            ───────            ─────                ────          │
//! │  Room             ProductGroup       Order ──┐            CashSession   │
//! │  DiningTable      Product            OrderLine│                         │
//! │                                      Invoice ─┘► settled  Parameters    │
//! │                                      InvoiceLine  (snapshot)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parent/child pairs (Order↔OrderLine, Invoice↔InvoiceLine) are owned
//! child collections keyed by parent id — foreign-key back references for
//! traversal, never cyclic object pointers.
//!
//! Every mutable entity carries a `version` column; state transitions are
//! guarded updates (`... AND version = ?`) so a losing writer fails instead
//! of silently re-applying.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Percent};
use crate::settlement::Rates;

// =============================================================================
// Floor Plan
// =============================================================================

/// A named section of the restaurant floor (main hall, terrace, bar).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Room {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Occupancy state of a dining table.
///
/// Invariant (eventually enforced by reconciliation): OCCUPIED iff at
/// least one OPEN order references the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Free,
    Occupied,
}

/// A seating unit whose occupancy mirrors order activity.
///
/// `identifier` is the human-readable label ("T-01"), unique per room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: String,
    pub room_id: String,
    pub identifier: String,
    /// Floor-plan layout hints for the (out-of-scope) map UI.
    pub position_x: f64,
    pub position_y: f64,
    pub status: TableStatus,
    pub version: i64,
}

impl DiningTable {
    /// Checks if the table is free.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.status == TableStatus::Free
    }
}

// =============================================================================
// People
// =============================================================================

/// A cashier/waiter. Credential storage is out of scope; this type only
/// anchors ownership references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// An optional invoice recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// Catalog grouping (beverages, mains, desserts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductGroup {
    pub id: String,
    pub name: String,
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub group_id: String,
    pub name: String,
    /// Short label for tickets and the quick menu.
    pub short_name: String,
    /// Current price in cents; order lines snapshot it at add time.
    pub price_cents: i64,
    /// Whether the product appears on the quick-access menu.
    pub quick_menu: bool,
    /// Units sold across all settlements. Best-effort counter, not part of
    /// any financial invariant.
    pub total_sales: i64,
    /// Whether product is active (soft delete).
    pub is_active: bool,
    pub version: i64,
}

impl Product {
    /// Returns the current price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// The status of an order (open tab).
///
/// Transitions are one-way: OPEN→INVOICED (settlement) or OPEN→CANCELLED,
/// never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Tab is open; lines can be added, updated and removed.
    Open,
    /// Settled into an invoice. Terminal.
    Invoiced,
    /// Explicitly cancelled. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Stable lowercase label, matching the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Invoiced => "invoiced",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

/// An open tab of line items, optionally bound to a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// None for bar tabs and walk-ups.
    pub table_id: Option<String>,
    /// The owning cashier/waiter. Mandatory.
    pub user_id: String,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Order {
    /// Checks if the order can still be mutated or settled.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

/// A line item on an order.
///
/// `unit_price_cents` is a snapshot of the product price at add time;
/// `subtotal_cents` is always `quantity × unit_price_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Invoices
// =============================================================================

/// The status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Counts toward session totals.
    Active,
    /// Annulled. Excluded from session totals; all other settlement side
    /// effects are preserved as audit trail.
    Void,
}

/// A finalized, priced, paid sales document.
///
/// Immutable once persisted except the ACTIVE→VOID status flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    /// Originating order; None for direct sales. A table settlement links
    /// the first consolidated order.
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub cashier_id: String,
    /// The cash session this invoice is reconciled under. Always set.
    pub session_id: String,
    pub subtotal_cents: i64,
    pub tax_sales_cents: i64,
    pub tax_service_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub cash_cents: i64,
    pub card_cents: i64,
    pub change_cents: i64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Invoice {
    /// Returns the invoice total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks if the invoice still counts toward session totals.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == InvoiceStatus::Active
    }
}

/// A line item on an invoice.
///
/// An independent snapshot copied from order lines (or direct input) at
/// settlement time — never a live reference to catalog or order data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    /// Product name at settlement time (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

// =============================================================================
// Cash Sessions
// =============================================================================

/// The status of a cash session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// A cashier's open-to-close working period.
///
/// Invariant: at most one OPEN session per cashier, enforced by a partial
/// unique index at the storage layer.
///
/// On close, system totals are recomputed from the session's ACTIVE
/// invoices and diffs are `declared − system` (negative ⇒ drawer short).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashSession {
    pub id: String,
    pub cashier_id: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub declared_cash_cents: Option<i64>,
    pub declared_card_cents: Option<i64>,
    pub system_cash_cents: i64,
    pub system_card_cents: i64,
    pub diff_cash_cents: Option<i64>,
    pub diff_card_cents: Option<i64>,
    pub status: SessionStatus,
    pub version: i64,
}

impl CashSession {
    /// Checks if the session is still open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// Live aggregate over the currently open session's active invoices.
/// Read-only; computed by `totals`, never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionTotals {
    pub invoice_count: i64,
    pub cash_cents: i64,
    pub card_cents: i64,
}

// =============================================================================
// Parameters
// =============================================================================

/// Singleton configuration row: tax rates, discount ceiling, restaurant
/// identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Parameters {
    pub id: i64,
    pub sales_tax_bps: i64,
    pub service_tax_bps: i64,
    pub max_discount_bps: i64,
    pub restaurant_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub version: i64,
}

impl Parameters {
    /// Returns the configured rates for the settlement algorithm.
    pub fn rates(&self) -> Rates {
        Rates {
            sales: Percent::from_bps(self.sales_tax_bps as u32),
            service: Percent::from_bps(self.service_tax_bps as u32),
            max_discount: Percent::from_bps(self.max_discount_bps as u32),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Open);
    }

    #[test]
    fn test_parameters_rates() {
        let params = Parameters {
            id: 1,
            sales_tax_bps: 1300,
            service_tax_bps: 1000,
            max_discount_bps: 1000,
            restaurant_name: "Mesa POS".to_string(),
            phone: None,
            address: None,
            version: 0,
        };
        let rates = params.rates();
        assert_eq!(rates.sales.bps(), 1300);
        assert_eq!(rates.service.bps(), 1000);
        assert_eq!(rates.max_discount.bps(), 1000);
    }

    #[test]
    fn test_line_money_accessors() {
        let line = OrderLine {
            id: "l1".to_string(),
            order_id: "o1".to_string(),
            product_id: "p1".to_string(),
            quantity: 3,
            unit_price_cents: 500,
            subtotal_cents: 1500,
            created_at: Utc::now(),
        };
        assert_eq!(line.unit_price().cents(), 500);
        assert_eq!(line.subtotal().cents(), 1500);
    }
}
