//! # Money
//!
//! Amounts are whole cents in an `i64`. Prices are stored that way, line
//! subtotals are `unit price × quantity` in cents, and the sale discount is
//! a basis-point rate applied once to the summed subtotal.
//!
//! ```text
//!   Product.price_cents ──► unit_price × qty ──► LineItem.subtotal
//!                                                      │
//!                                        Σ subtotals ◄─┘
//!                                             │
//!                          discount_of(rate) ─┴─► Sale.total = subtotal - discount
//! ```
//!
//! ```rust
//! use stockroom_core::money::Money;
//! use stockroom_core::types::DiscountRate;
//!
//! let subtotal = Money::from_cents(1000) * 3;
//! assert_eq!(subtotal.apply_discount(DiscountRate::from_bps(1000)).cents(), 2700);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::types::DiscountRate;

/// Basis points in 100%.
const FULL_BPS: i128 = 10_000;

/// An amount in cents. Negative values only appear as differences.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self × qty`, or `None` when the product leaves `i64`.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// The part of `self` taken off by `rate`, rounded half up to a cent.
    ///
    /// Computed in `i128` so `i64::MAX` cents at 100% cannot overflow.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    /// use stockroom_core::types::DiscountRate;
    ///
    /// // 12.5% of 99 cents is 12.375
    /// assert_eq!(Money::from_cents(99).discount_of(DiscountRate::from_bps(1250)).cents(), 12);
    /// ```
    pub fn discount_of(&self, rate: DiscountRate) -> Money {
        let taken = (i128::from(self.0) * i128::from(rate.bps()) + FULL_BPS / 2) / FULL_BPS;
        // |taken| <= |self| because rate.bps() <= FULL_BPS.
        Money(taken as i64)
    }

    /// `self` less [`discount_of`](Self::discount_of).
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.discount_of(rate)
    }
}

// =============================================================================
// Operators
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
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

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
