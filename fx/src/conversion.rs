//! Currency conversion request and result types.

use std::str::FromStr;

use fxbrief_common::{Currency, CurrencyPair, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

/// Request to perform a conversion, as received on the wire.
///
/// Fields are kept loose so the engine can classify bad input itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionRequest {
    /// Amount in the base currency, in its raw JSON form.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Base currency code.
    #[serde(default, rename = "from_currency")]
    pub base: Option<String>,
    /// Target currency code.
    #[serde(default, rename = "to_currency")]
    pub target: Option<String>,
}

impl ConversionRequest {
    /// Create a new conversion request.
    pub fn new(
        amount: impl Into<serde_json::Value>,
        base: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            amount: Some(amount.into()),
            base: Some(base.into()),
            target: Some(target.into()),
        }
    }

    /// Validated amount.
    pub fn amount(&self) -> FxResult<Decimal> {
        parse_amount(self.amount.as_ref())
    }

    /// Validated currency pair, exactly as given.
    pub fn pair(&self) -> FxResult<CurrencyPair> {
        let base = currency(self.base.as_deref(), "from_currency")?;
        let target = currency(self.target.as_deref(), "to_currency")?;
        Ok(CurrencyPair::new(base, target))
    }
}

fn currency(code: Option<&str>, field: &str) -> FxResult<Currency> {
    match code.map(Currency::new) {
        Some(currency) if !currency.is_blank() => Ok(currency),
        _ => Err(FxError::InvalidCurrency(format!("{} is required", field))),
    }
}

/// Parse a raw amount.
///
/// Accepts JSON numbers and numeric strings. Missing, non-numeric, non-finite
/// and non-positive values are rejected, as are finite numbers a `Decimal`
/// cannot hold.
pub fn parse_amount(raw: Option<&serde_json::Value>) -> FxResult<Decimal> {
    let text = match raw {
        None | Some(serde_json::Value::Null) => {
            return Err(FxError::InvalidAmount("amount is required".to_string()))
        }
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(FxError::InvalidAmount(format!("amount must be a number, got {}", other)))
        }
    };

    let amount = match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(amount) => amount,
        Err(_) => return Err(unparsable_amount(&text)),
    };

    if amount <= Decimal::ZERO {
        return Err(FxError::InvalidAmount(format!("amount must be positive, got {}", amount)));
    }

    Ok(amount)
}

fn unparsable_amount(text: &str) -> FxError {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            FxError::InvalidAmount(format!("amount out of range, got {}", text))
        }
        Ok(value) if value.is_finite() => {
            FxError::InvalidAmount(format!("amount must be positive, got {}", text))
        }
        _ => FxError::InvalidAmount(format!("amount must be a finite number, got {:?}", text)),
    }
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Amount converted, in the base currency.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub base: Currency,
    pub target: Currency,
    /// Rate applied. Rounded for display on fresh fetches only.
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    /// Converted amount with exactly two decimal digits.
    pub converted_amount: String,
    pub analysis: String,
    /// When the underlying rate was fetched.
    pub timestamp: Timestamp,
    /// Whether the quote came from cache.
    pub cached: bool,
    /// Provenance tag.
    pub source: String,
}
