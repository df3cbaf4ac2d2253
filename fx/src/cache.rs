//! Quote caching with TTL support.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;
use dashmap::DashMap;
use fxbrief_common::{constants, expires_in, is_expired, now, CurrencyPair, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// A fetched rate together with its commentary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    /// Full-precision rate as returned by the provider.
    pub rate: Decimal,
    /// Commentary attached when the rate was fetched.
    pub analysis: String,
    /// When the rate was fetched.
    pub timestamp: Timestamp,
    /// Provider that produced the rate.
    pub source: String,
}

impl RateQuote {
    /// Create a quote stamped with the current time.
    pub fn new(rate: Decimal, analysis: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            rate,
            analysis: analysis.into(),
            timestamp: now(),
            source: source.into(),
        }
    }
}

/// Cached quote entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    quote: RateQuote,
    expires_at: Timestamp,
}

impl CacheEntry {
    fn new(quote: RateQuote, ttl: Duration) -> Self {
        Self {
            quote,
            expires_at: expires_in(ttl),
        }
    }

    fn is_valid(&self) -> bool {
        !is_expired(self.expires_at)
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// TTL applied to every stored quote.
    pub default_ttl: Duration,
    /// Entry count at which a write first evicts expired entries.
    pub max_entries: usize,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: constants::quote_ttl(),
            max_entries: 10000,
        }
    }
}

/// Thread-safe quote cache keyed by ordered currency pair.
pub struct RateCache {
    cache: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a quote from cache if it has not expired.
    pub fn get(&self, pair: &CurrencyPair) -> Option<RateQuote> {
        let key = Self::cache_key(pair);

        if let Some(entry) = self.cache.get(&key) {
            if entry.is_valid() {
                debug!(pair = %pair, "Cache hit");
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.quote.clone());
            }

            debug!(pair = %pair, "Cache entry expired");
            drop(entry);
            // A concurrent put may have refreshed the entry in between.
            self.cache.remove_if(&key, |_, entry| !entry.is_valid());
        }

        debug!(pair = %pair, "Cache miss");
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a quote, replacing any entry for the same pair.
    pub fn put(&self, pair: &CurrencyPair, quote: RateQuote) {
        self.put_with_ttl(pair, quote, self.config.default_ttl);
    }

    /// Store a quote with custom TTL.
    pub fn put_with_ttl(&self, pair: &CurrencyPair, quote: RateQuote, ttl: Duration) {
        let key = Self::cache_key(pair);

        if self.cache.len() >= self.config.max_entries {
            self.evict_expired();
        }

        self.cache.insert(key, CacheEntry::new(quote, ttl));
    }

    /// Get the number of entries in cache, expired ones included.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_valid());
        before.saturating_sub(self.cache.len())
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let valid = self.cache.iter().filter(|e| e.is_valid()).count();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_entries: total,
            valid_entries: valid,
            expired_entries: total.saturating_sub(valid),
        }
    }

    fn cache_key(pair: &CurrencyPair) -> String {
        format!("{}/{}", pair.base.code(), pair.target.code())
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}
