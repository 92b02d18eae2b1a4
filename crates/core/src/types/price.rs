//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as plain JSON numbers in the store's single
//! currency. They are held as [`Decimal`] so cart totals never accumulate
//! floating point error.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "WirePrice", into = "WirePrice")]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Parse a price from text such as `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a decimal or is negative.
    pub fn parse(text: &str) -> Result<Self, PriceError> {
        let amount: Decimal = text
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(text.to_owned()))?;
        Self::new(amount)
    }

    /// The amount in the store currency.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u64) -> Decimal {
        self.0.saturating_mul(Decimal::from(quantity))
    }

    /// Format with a currency symbol, e.g. `$19.99`.
    #[must_use]
    pub fn display(self, symbol: &str) -> String {
        format!("{symbol}{:.2}", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

/// JSON representation: a plain number.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct WirePrice(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl TryFrom<WirePrice> for Price {
    type Error = PriceError;

    fn try_from(wire: WirePrice) -> Result<Self, Self::Error> {
        Self::new(wire.0)
    }
}

impl From<Price> for WirePrice {
    fn from(price: Price) -> Self {
        Self(price.0)
    }
}
