//! Monetary types for fxbrief.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places used when rendering a converted amount.
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

/// Decimal places used when displaying a freshly fetched rate.
pub const RATE_DISPLAY_DECIMAL_PLACES: u32 = 4;

/// Currency code.
///
/// Codes are carried exactly as supplied. No ISO 4217 lookup and no case
/// folding is applied, so `"usd"` and `"USD"` are distinct currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check whether the code is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An ordered currency pair for conversions.
///
/// `USD/EUR` and `EUR/USD` are different pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency the amount is expressed in.
    pub base: Currency,
    /// Currency the amount is converted into.
    pub target: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, target: Currency) -> Self {
        Self { base, target }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.target)
    }
}

/// Round half away from zero to `dp` decimal places.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round and render with exactly `dp` decimal digits, padding with zeros.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = round_half_up(value, dp);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Convert `amount` at `rate` and render it with two decimal digits.
///
/// Returns `None` when the product does not fit in a `Decimal`.
pub fn converted_amount(amount: Decimal, rate: Decimal) -> Option<String> {
    amount
        .checked_mul(rate)
        .map(|value| format_fixed(value, AMOUNT_DECIMAL_PLACES))
}

/// Rate as shown on a freshly fetched conversion: four decimals, trailing
/// zeros dropped.
pub fn display_rate(rate: Decimal) -> Decimal {
    round_half_up(rate, RATE_DISPLAY_DECIMAL_PLACES).normalize()
}
