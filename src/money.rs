use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Money held as a whole number of the currency's smallest unit.
///
/// Every amount the ledger computes or stores is an integer count of minor
/// units; fractional minor units never exist. Splitting and interest both
/// truncate, which for the non-negative amounts the ledger deals in is the
/// same as flooring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const ONE: Money = Money(1);

    /// create from minor units (cents, kobo, ...)
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// amount in minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// major-unit decimal for display, e.g. `12345` with scale 2 is `123.45`
    pub fn as_major(&self, scale: u32) -> Decimal {
        Decimal::new(self.0, scale)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// split into `parts` equal shares, flooring; returns `(share, remainder)`
    ///
    /// `share * parts + remainder == self` always holds.
    pub fn split_evenly(&self, parts: u32) -> Option<(Money, Money)> {
        if parts == 0 {
            return None;
        }
        let parts = i64::from(parts);
        Some((Money(self.0.div_euclid(parts)), Money(self.0.rem_euclid(parts))))
    }

    /// interest on this balance at `rate`, floored to a whole minor unit
    pub fn interest_at(&self, rate: Rate) -> Option<Money> {
        let exact = Decimal::from(self.0).checked_mul(rate.as_decimal())?;
        exact.floor().to_i64().map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money::from_minor(amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// nominal monthly interest rate as a whole percentage, applied to the declining balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    /// create from percentage (e.g., 10 for 10% a month)
    pub const fn from_percentage(percent: u32) -> Self {
        Rate(percent)
    }

    pub const fn percent(&self) -> u32 {
        self.0
    }

    /// fraction form, 10% is 0.10
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0) / dec!(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
