//! # Money Module
//!
//! Provides the `Money` and `Percent` types used by every financial
//! computation in Mesa POS.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    All amounts are i64 cents; the database stores cents in INTEGER      │
//! │    columns, which realizes fixed-point decimal(10,2) exactly.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Contract
//! Taxes and discounts are percentages of an amount, rounded **half-up to
//! 2 decimals at each step** — not only at the end. `Money::percent_of` is
//! the single primitive implementing that contract; every tax and discount
//! figure in an invoice goes through it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: session differences (declared − system) are negative
///   when the drawer is short
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity.
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes `rate` percent of this amount, rounded half-up to 2 decimals.
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents × bps + 5000) / 10000`. The `+5000`
    /// (half of the 10000 divisor) implements round-half-up without ever
    /// touching floating point.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::{Money, Percent};
    ///
    /// let subtotal = Money::from_cents(100_000);        // 1000.00
    /// let sales_tax = subtotal.percent_of(Percent::from_bps(1300)); // 13%
    /// assert_eq!(sales_tax.cents(), 13_000);            // 130.00
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        // i128 prevents overflow on large amounts
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Returns the larger of this amount and zero.
    ///
    /// Used for change computation: a 1-cent underpayment inside the
    /// tolerance must not produce negative change.
    #[inline]
    pub const fn clamp_floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }
}

/// Display implementation shows the amount with two decimals.
///
/// For debugging and logs; currency formatting belongs to the
/// (out-of-scope) presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Percent Type
// =============================================================================

/// A percentage in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000. Tax and discount percentages are
/// configured with two decimals (13.00%), which basis points represent
/// exactly: 1300 bps = 13.00%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(Money::from_cents(299).times(3).cents(), 897);
    }

    #[test]
    fn test_percent_of_exact() {
        // 1000.00 at 13% = 130.00, no rounding needed
        let amount = Money::from_cents(100_000);
        let tax = amount.percent_of(Percent::from_bps(1300));
        assert_eq!(tax.cents(), 13_000);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // 10.05 at 8.25% = 0.829125 → 0.83
        let amount = Money::from_cents(1005);
        let tax = amount.percent_of(Percent::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // 0.50 at 1% = 0.005 → rounds up to 0.01
        let amount = Money::from_cents(50);
        assert_eq!(amount.percent_of(Percent::from_bps(100)).cents(), 1);
    }

    #[test]
    fn test_percent_of_zero_rate() {
        let amount = Money::from_cents(123_456);
        assert_eq!(amount.percent_of(Percent::zero()).cents(), 0);
    }

    #[test]
    fn test_clamp_floor_zero() {
        assert_eq!(Money::from_cents(-1).clamp_floor_zero().cents(), 0);
        assert_eq!(Money::from_cents(42).clamp_floor_zero().cents(), 42);
    }

    #[test]
    fn test_percent_display() {
        assert_eq!(format!("{}", Percent::from_bps(1300)), "13.00%");
        assert_eq!(format!("{}", Percent::from_bps(825)), "8.25%");
    }
}
