//! Rate provider traits and implementations.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use fxbrief_common::{constants, Currency, CurrencyPair, DurationExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Public Frankfurter endpoint for latest reference rates.
pub const FRANKFURTER_URL: &str = "https://api.frankfurter.app/latest";

/// Provenance tag reported for rates fetched from Frankfurter.
pub const FRANKFURTER_SOURCE: &str = "frankfurter";

/// Trait for live FX rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provenance tag attached to rates from this provider.
    fn name(&self) -> &str;

    /// Fetch the current rate for converting `pair.base` into `pair.target`.
    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal>;
}

/// Parse a rate from its textual form.
///
/// Accepts plain and scientific notation. Rejects anything that is not a
/// positive finite number.
pub fn parse_rate(raw: &str) -> FxResult<Decimal> {
    let trimmed = raw.trim();
    let rate = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| FxError::InvalidRate(format!("not a finite number: {:?}", raw)))?;

    if rate <= Decimal::ZERO {
        return Err(FxError::InvalidRate(format!("rate must be positive, got {}", rate)));
    }

    Ok(rate)
}

/// Body returned by the rate service.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
}

/// Pick the target rate out of a `rates` mapping.
fn rate_from_response(body: &RatesResponse, target: &Currency) -> FxResult<Decimal> {
    let value = body
        .rates
        .get(target.code())
        .ok_or_else(|| FxError::InvalidRate(format!("no rate for {} in response", target)))?;

    match value {
        serde_json::Value::Number(n) => parse_rate(&n.to_string()),
        serde_json::Value::String(s) => parse_rate(s),
        other => Err(FxError::InvalidRate(format!("unexpected rate value {}", other))),
    }
}

/// Rate provider backed by an HTTP currency-conversion service.
///
/// Issues `GET <base_url>?from=<base>&to=<target>` and expects a JSON body
/// with a `rates` object keyed by the target code.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
    name: String,
    timeout: Duration,
}

impl HttpRateProvider {
    /// Create a provider against `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            name: FRANKFURTER_SOURCE.to_string(),
            timeout: constants::upstream_timeout().as_std(),
        }
    }

    /// Create a provider against the public Frankfurter endpoint.
    pub fn frankfurter(client: reqwest::Client) -> Self {
        Self::new(client, FRANKFURTER_URL)
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("from", pair.base.code()), ("to", pair.target.code())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                FxError::upstream(
                    e.status().map(|s| s.as_u16()),
                    format!("request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(provider = %self.name, pair = %pair, status = status.as_u16(), "Rate provider returned error status");
            return Err(FxError::upstream(
                Some(status.as_u16()),
                format!("{} returned status {}", self.name, status),
            ));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| FxError::upstream(None, format!("malformed response: {}", e.without_url())))?;

        let rate = rate_from_response(&body, &pair.target)
            .map_err(|e| FxError::upstream(None, e.to_string()))?;

        debug!(provider = %self.name, pair = %pair, rate = %rate, "Got rate from provider");
        Ok(rate)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rates: dashmap::DashMap<String, Decimal>,
    failures: dashmap::DashMap<String, Option<u16>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rates: dashmap::DashMap::new(),
            failures: dashmap::DashMap::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set a rate for a currency pair.
    pub fn set_rate(&self, base: &str, target: &str, rate: Decimal) {
        let key = format!("{}/{}", base, target);
        self.failures.remove(&key);
        self.rates.insert(key, rate);
    }

    /// Make lookups for a pair fail with the given upstream status.
    pub fn fail_with(&self, base: &str, target: &str, status: Option<u16>) {
        self.failures.insert(format!("{}/{}", base, target), status);
    }

    /// Number of `get_rate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let key = format!("{}", pair);

        if let Some(status) = self.failures.get(&key) {
            return Err(FxError::upstream(*status, "mock failure"));
        }

        self.rates
            .get(&key)
            .map(|r| *r)
            .ok_or_else(|| FxError::upstream(Some(404), format!("no rate for {}", pair)))
    }
}
