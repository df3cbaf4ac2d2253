//! Conversion engine: cache lookup, live fetch, commentary.

use std::sync::Arc;

use fxbrief_common::{converted_amount, display_rate, CurrencyPair};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::analyst::{AnalystStats, MarketAnalyst};
use crate::cache::{CacheStats, RateCache, RateCacheConfig, RateQuote};
use crate::conversion::{ConversionRequest, ConversionResult};
use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;

/// Provenance tag reported for conversions served from cache.
pub const CACHE_SOURCE: &str = "cache";

/// Configuration for the conversion engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
}

/// Converts amounts using cached or live quotes.
pub struct ConversionEngine {
    provider: Arc<dyn RateProvider>,
    analyst: MarketAnalyst,
    cache: RateCache,
}

impl ConversionEngine {
    /// Create a new engine.
    pub fn new(provider: Arc<dyn RateProvider>, analyst: MarketAnalyst, config: EngineConfig) -> Self {
        Self {
            provider,
            analyst,
            cache: RateCache::with_config(config.cache),
        }
    }

    /// Convert an amount.
    ///
    /// Input is validated before the cache or any provider is touched. A
    /// cached quote is reused until it expires; otherwise a live rate is
    /// fetched, annotated and cached.
    #[instrument(skip(self, request), fields(from = ?request.base, to = ?request.target))]
    pub async fn convert(&self, request: ConversionRequest) -> FxResult<ConversionResult> {
        let amount = request.amount()?;
        let pair = request.pair()?;

        if let Some(quote) = self.cache.get(&pair) {
            debug!(pair = %pair, "Using cached quote");
            return Self::from_cache(amount, pair, quote);
        }

        let quote = self.fetch_quote(&pair).await?;
        self.cache.put(&pair, quote.clone());

        let result = ConversionResult {
            amount,
            rate: display_rate(quote.rate),
            converted_amount: convert_amount(amount, quote.rate)?,
            analysis: quote.analysis,
            timestamp: quote.timestamp,
            cached: false,
            source: quote.source,
            base: pair.base,
            target: pair.target,
        };

        info!(
            rate = %result.rate,
            converted_amount = %result.converted_amount,
            source = %result.source,
            "Conversion completed"
        );

        Ok(result)
    }

    /// Fetch a live rate and attach commentary.
    async fn fetch_quote(&self, pair: &CurrencyPair) -> FxResult<RateQuote> {
        let rate = self.provider.get_rate(pair).await?;
        let analysis = self.analyst.analyze(pair, rate).await;
        Ok(RateQuote::new(rate, analysis, self.provider.name()))
    }

    fn from_cache(amount: Decimal, pair: CurrencyPair, quote: RateQuote) -> FxResult<ConversionResult> {
        Ok(ConversionResult {
            amount,
            base: pair.base,
            target: pair.target,
            // Stored precision, not re-rounded.
            rate: quote.rate,
            converted_amount: convert_amount(amount, quote.rate)?,
            analysis: quote.analysis,
            timestamp: quote.timestamp,
            cached: true,
            source: CACHE_SOURCE.to_string(),
        })
    }

    /// Name of the live rate provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Get engine statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.cache.stats(),
            commentary: self.analyst.stats(),
        }
    }

    /// Drop expired quotes, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cache.evict_expired()
    }
}

fn convert_amount(amount: Decimal, rate: Decimal) -> FxResult<String> {
    converted_amount(amount, rate).ok_or_else(|| {
        FxError::InvalidAmount(format!("amount out of range: {} at rate {} overflows", amount, rate))
    })
}

/// Engine statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub cache: CacheStats,
    pub commentary: AnalystStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyst::MockCommentaryModel;
    use crate::commentary::synthesize;
    use crate::error::FxError;
    use crate::provider::MockRateProvider;
    use chrono::Duration;
    use fxbrief_common::Currency;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn setup_engine(config: EngineConfig) -> (ConversionEngine, Arc<MockRateProvider>) {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_rate("USD", "EUR", dec!(0.92));
        provider.set_rate("EUR", "USD", dec!(1.0869));
        provider.set_rate("USD", "JPY", dec!(151.234567));

        let analyst = MarketAnalyst::new(Arc::new(MockCommentaryModel::replying("Model view.")));
        let engine = ConversionEngine::new(provider.clone(), analyst, config);
        (engine, provider)
    }

    fn short_ttl(ms: i64) -> EngineConfig {
        EngineConfig {
            cache: RateCacheConfig {
                default_ttl: Duration::milliseconds(ms),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_convert_fresh() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        let result = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();

        assert_eq!(result.rate, dec!(0.92));
        assert_eq!(result.converted_amount, "92.00");
        assert_eq!(result.analysis, "Model view.");
        assert!(!result.cached);
        assert_eq!(result.source, "test");
        assert_eq!(result.base, Currency::usd());
        assert_eq!(result.target, Currency::eur());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_repeat_conversion_hits_cache() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        let first = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        let second = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();

        assert!(second.cached);
        assert_eq!(second.rate, first.rate);
        assert_eq!(second.analysis, first.analysis);
        assert_eq!(second.converted_amount, "92.00");
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(second.source, CACHE_SOURCE);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_quote_recomputes_amount() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        let result = engine.convert(ConversionRequest::new(250.5, "USD", "EUR")).await.unwrap();

        assert!(result.cached);
        assert_eq!(result.converted_amount, "230.46");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_display_rounding_only_on_fresh_path() {
        let (engine, _) = setup_engine(EngineConfig::default());

        let fresh = engine.convert(ConversionRequest::new(10, "USD", "JPY")).await.unwrap();
        let cached = engine.convert(ConversionRequest::new(10, "USD", "JPY")).await.unwrap();

        assert_eq!(fresh.rate, dec!(151.2346));
        assert_eq!(cached.rate, dec!(151.234567));
        // Both amounts use the full-precision rate.
        assert_eq!(fresh.converted_amount, "1512.35");
        assert_eq!(cached.converted_amount, "1512.35");
    }

    #[tokio::test]
    async fn test_cache_key_asymmetry() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        let reverse = engine.convert(ConversionRequest::new(100, "EUR", "USD")).await.unwrap();

        assert!(!reverse.cached);
        assert_eq!(reverse.rate, dec!(1.0869));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_quote_triggers_one_fetch() {
        let (engine, provider) = setup_engine(short_ttl(50));

        engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        provider.set_rate("USD", "EUR", dec!(0.93));
        let refreshed = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        assert!(!refreshed.cached);
        assert_eq!(refreshed.converted_amount, "93.00");
        assert_eq!(provider.calls(), 2);

        let again = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap();
        assert!(again.cached);
        assert_eq!(again.rate, dec!(0.93));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_amount_makes_no_calls() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        let requests = [
            ConversionRequest::new(0, "USD", "EUR"),
            ConversionRequest::new(-10, "USD", "EUR"),
            ConversionRequest::new("ten", "USD", "EUR"),
            ConversionRequest {
                amount: None,
                base: Some("USD".into()),
                target: Some("EUR".into()),
            },
        ];

        for request in requests {
            let err = engine.convert(request).await.unwrap_err();
            assert!(matches!(err, FxError::InvalidAmount(_)));
            assert_eq!(err.error_code(), "INV-AMT");
        }

        assert_eq!(provider.calls(), 0);
        assert_eq!(engine.stats().cache.misses, 0);
    }

    #[tokio::test]
    async fn test_overflowing_amount_is_rejected() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        let err = engine.convert(ConversionRequest::new(1e27, "USD", "JPY")).await.unwrap_err();
        assert!(matches!(err, FxError::InvalidAmount(ref msg) if msg.contains("out of range")));
        assert_eq!(err.error_code(), "INV-AMT");
        assert_eq!(provider.calls(), 1);

        // The quote itself was valid and stays usable.
        let cached = engine.convert(ConversionRequest::new(1e27, "USD", "JPY")).await.unwrap_err();
        assert!(matches!(cached, FxError::InvalidAmount(_)));
        let ok = engine.convert(ConversionRequest::new(10, "USD", "JPY")).await.unwrap();
        assert!(ok.cached);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_amount_checked_before_currency() {
        let (engine, _) = setup_engine(EngineConfig::default());

        let request = ConversionRequest {
            amount: Some(json!(-1)),
            base: None,
            target: None,
        };

        assert!(matches!(engine.convert(request).await, Err(FxError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_missing_currency() {
        let (engine, provider) = setup_engine(EngineConfig::default());

        let request = ConversionRequest {
            amount: Some(json!(100)),
            base: Some("USD".into()),
            target: Some("".into()),
        };

        assert!(matches!(engine.convert(request).await, Err(FxError::InvalidCurrency(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let (engine, provider) = setup_engine(EngineConfig::default());
        provider.fail_with("USD", "EUR", Some(503));

        let err = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap_err();

        assert_eq!(err.error_code(), "SRV-503");
        assert_eq!(engine.stats().cache.total_entries, 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_without_status() {
        let (engine, provider) = setup_engine(EngineConfig::default());
        provider.fail_with("USD", "EUR", None);

        let err = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await.unwrap_err();

        assert_eq!(err.error_code(), "SRV-500");
    }

    #[tokio::test]
    async fn test_commentary_failure_uses_template() {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_rate("GBP", "USD", dec!(1.27));
        let analyst = MarketAnalyst::new(Arc::new(MockCommentaryModel::failing()));
        let engine = ConversionEngine::new(provider, analyst, EngineConfig::default());

        let result = engine.convert(ConversionRequest::new(10, "GBP", "USD")).await.unwrap();

        let pair = CurrencyPair::new(Currency::gbp(), Currency::usd());
        assert_eq!(result.analysis, synthesize(&pair, dec!(1.27)));
        assert!(result.analysis.contains("GBP"));
        assert!(result.analysis.contains("USD"));
        assert!(result.analysis.contains("strengthening"));
        assert_eq!(result.converted_amount, "12.70");
        assert_eq!(engine.stats().commentary.fallbacks, 1);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_quotes() {
        let (engine, _) = setup_engine(short_ttl(10));

        engine.convert(ConversionRequest::new(1, "USD", "EUR")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(engine.cleanup(), 1);
        assert_eq!(engine.stats().cache.total_entries, 0);
    }
}
