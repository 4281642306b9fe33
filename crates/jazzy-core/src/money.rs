//! # Money Type
//!
//! Integer-cent money for every cost and price in the ledger, plus the
//! rounding rules reports rely on.
//!
//! ## Where Rounding Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  batch cost × qty ──► Σ over draws ──► average_over(qty)   (FIFO cost)  │
//! │  profit, revenue   ──────────────────► margin_bps(revenue) (reports)    │
//! │  part, whole       ──────────────────► ratio_bps(part, whole)           │
//! │                                                                         │
//! │  Only the last step divides, and it rounds half away from zero.         │
//! │  Ledger rows store cents (i64); the dashboard formats dollars.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use jazzy_core::money::Money;
//!
//! let batch_cost = Money::from_cents(4000); // $40.00
//! assert_eq!(batch_cost.multiply_quantity(2).cents(), 8000);
//! assert_eq!(Money::from_cents(10000).average_over(3).cents(), 3333);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Cents, signed: a below-cost sale has negative profit.
///
/// Serializes as a bare integer, so ledger JSON carries cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Whole dollars, as invoices and the sample catalogue state them.
    ///
    /// ```rust
    /// use jazzy_core::money::Money;
    ///
    /// assert_eq!(Money::from_dollars(250).cents(), 25000);
    /// ```
    #[inline]
    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Line total for `qty` units at this unit amount.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Spreads a total across `qty` units.
    ///
    /// A non-positive `qty` averages to zero.
    ///
    /// ```rust
    /// use jazzy_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(20000).average_over(4).cents(), 5000);
    /// assert_eq!(Money::from_cents(5).average_over(2).cents(), 3);
    /// assert_eq!(Money::from_cents(100).average_over(0).cents(), 0);
    /// ```
    pub fn average_over(&self, qty: i64) -> Money {
        Money(ratio(self.0, 1, qty) as i64)
    }

    /// Profit margin of `self` over `revenue`, in basis points
    /// (2500 = 25.00%). Zero revenue yields zero.
    pub fn margin_bps(&self, revenue: Money) -> i64 {
        ratio_bps(self.0, revenue.0)
    }
}

/// `part / whole` in basis points; zero when `whole` is not positive.
///
/// ```rust
/// use jazzy_core::money::ratio_bps;
///
/// assert_eq!(ratio_bps(1, 3), 3333);
/// assert_eq!(ratio_bps(3, 4), 7500);
/// assert_eq!(ratio_bps(7, 0), 0);
/// ```
pub fn ratio_bps(part: i64, whole: i64) -> i64 {
    ratio(part, 10_000, whole) as i64
}

/// Mean of `total` over `count` items, rounded like every other ratio here.
pub fn mean(total: i64, count: i64) -> i64 {
    ratio(total, 1, count) as i64
}

/// `value × scale / divisor` in i128, rounding half away from zero.
fn ratio(value: i64, scale: i64, divisor: i64) -> i128 {
    if divisor <= 0 {
        return 0;
    }
    let numerator = value as i128 * scale as i128;
    let divisor = divisor as i128;
    let quotient = numerator / divisor;
    let remainder = numerator % divisor;
    if 2 * remainder.abs() >= divisor {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, cents / 100, cents % 100)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(25000).to_string(), "$250.00");
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_line_totals() {
        let cost = Money::from_dollars(40);
        let price = Money::from_cents(1099);
        assert_eq!((cost + price).cents(), 5099);
        assert_eq!((cost - price).cents(), 2901);
        assert_eq!((price * 3).cents(), 3297);
        assert_eq!(price.multiply_quantity(3), price * 3);

        let total: Money = vec![cost, price, price].into_iter().sum();
        assert_eq!(total.cents(), 6198);
    }

    #[test]
    fn test_average_rounding() {
        // (2 x $40 + 2 x $60) / 4 = $50
        assert_eq!(Money::from_cents(20000).average_over(4).cents(), 5000);
        assert_eq!(Money::from_cents(10000).average_over(3).cents(), 3333);
        assert_eq!(Money::from_cents(20000).average_over(3).cents(), 6667);
        // exact half rounds away from zero
        assert_eq!(Money::from_cents(5).average_over(2).cents(), 3);
        assert_eq!(Money::from_cents(-5).average_over(2).cents(), -3);
    }

    #[test]
    fn test_average_over_zero_quantity() {
        assert_eq!(Money::from_cents(999).average_over(0), Money::zero());
        assert_eq!(Money::from_cents(999).average_over(-1), Money::zero());
    }

    #[test]
    fn test_margin_bps() {
        let revenue = Money::from_cents(25000);
        assert_eq!(Money::from_cents(15000).margin_bps(revenue), 6000);
        assert_eq!(Money::from_cents(-2500).margin_bps(revenue), -1000);
        assert_eq!(Money::from_cents(15000).margin_bps(Money::zero()), 0);
    }

    #[test]
    fn test_ratio_and_mean() {
        assert_eq!(ratio_bps(2, 3), 6667);
        assert_eq!(ratio_bps(0, 5), 0);
        assert_eq!(ratio_bps(4, 0), 0);
        assert_eq!(mean(6001, 2), 3001);
        assert_eq!(mean(-5, 2), -3);
        assert_eq!(mean(10, 0), 0);
    }
}
