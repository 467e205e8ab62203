//! # mesa-core: Pure Business Logic for Mesa POS
//!
//! This crate is the **heart** of Mesa POS. It contains the settlement
//! algorithm and all domain rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               REST / UI layer (out of scope)                    │   │
//! │  │    thin wrappers over the repository operations below           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mesa-db (Storage Layer)                      │   │
//! │  │   orders / invoices / cash sessions / floor / catalog repos     │   │
//! │  │   one transaction per public operation                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ mesa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────────┐ │   │
//! │  │  │  types   │ │  money   │ │ settlement │ │commands/validation│ │   │
//! │  │  │  Order   │ │  Money   │ │ consolidate│ │  typed commands   │ │   │
//! │  │  │  Invoice │ │  Percent │ │ compute    │ │  field checks     │ │   │
//! │  │  └──────────┘ └──────────┘ └────────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Invoice, CashSession, ...)
//! - [`money`] - Integer-cents Money and basis-points Percent
//! - [`settlement`] - Consolidation + the financial breakdown algorithm
//! - [`commands`] - Typed command structs, validated at the door
//! - [`validation`] - Shared field validators
//! - [`error`] - Domain error taxonomy
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: cents (i64) and basis points (u32), never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use mesa_core::money::{Money, Percent};
//! use mesa_core::settlement::{self, Charges, Rates, SettleLine, Tender};
//!
//! let lines = settlement::consolidate(vec![
//!     SettleLine::new("p1", "Gallo pinto", 2, 350),
//!     SettleLine::new("p1", "Gallo pinto", 1, 350),
//! ]);
//!
//! let breakdown = settlement::compute(
//!     &lines,
//!     Rates {
//!         sales: Percent::from_bps(1300),
//!         service: Percent::from_bps(1000),
//!         max_discount: Percent::from_bps(1000),
//!     },
//!     Charges {
//!         apply_sales_tax: true,
//!         apply_service_tax: true,
//!         discount: Percent::zero(),
//!     },
//!     Tender {
//!         cash: Money::from_cents(1292),
//!         card: Money::zero(),
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(breakdown.subtotal.cents(), 1050);
//! assert_eq!(breakdown.total.cents(), 1292); // + 13% + 10%, rounded per step
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commands;
pub mod error;
pub mod money;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mesa_core::Money` instead of
// `use mesa_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use settlement::Breakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed on a single order.
///
/// ## Business Reason
/// Prevents runaway tabs and keeps tickets printable.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Underpayment tolerance in cents, absorbing cash-rounding at the drawer.
/// A shortfall beyond this fails settlement.
pub const PAYMENT_TOLERANCE_CENTS: i64 = 1;
