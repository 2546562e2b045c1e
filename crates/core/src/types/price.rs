//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as integer minor units (kopiykas) and exposed as
//! [`Decimal`] amounts so that totals never pick up float rounding.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a price to minor units.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more decimal places than the currency allows.
    #[error("price cannot have more than two decimal places")]
    TooPrecise,
    /// The amount does not fit in the storage type.
    #[error("price is out of range")]
    OutOfRange,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (hryvnias, not kopiykas).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a UAH price from minor units.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2), CurrencyCode::UAH)
    }

    /// A zero UAH price.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    /// Convert to minor units for storage.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the amount is negative, has more than two
    /// decimal places, or does not fit in an `i64`.
    pub fn to_cents(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if self.amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        (self.amount * Decimal::ONE_HUNDRED)
            .to_i64()
            .ok_or(PriceError::OutOfRange)
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency_code.code())
    }
}

/// ISO 4217 currency codes the shop prices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    UAH,
    EUR,
    USD,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UAH => "UAH",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }
}
