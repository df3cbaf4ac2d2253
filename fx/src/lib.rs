//! fxbrief FX Engine
//!
//! Currency conversion with a short market commentary attached to every
//! quote.
//!
//! # Features
//!
//! - Live rate lookup through a pluggable [`RateProvider`]
//! - Generative commentary with a deterministic templated fallback
//! - Quote caching per ordered currency pair with a fixed TTL
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxbrief_fx::{ConversionEngine, ConversionRequest, EngineConfig, HttpRateProvider, MarketAnalyst};
//!
//! let engine = ConversionEngine::new(
//!     Arc::new(HttpRateProvider::frankfurter(client.clone())),
//!     MarketAnalyst::fallback_only(),
//!     EngineConfig::default(),
//! );
//!
//! let result = engine.convert(ConversionRequest::new(100, "USD", "EUR")).await?;
//! println!("{} {}", result.converted_amount, result.target);
//! ```

pub mod analyst;
pub mod cache;
pub mod commentary;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod provider;

#[cfg(test)]
mod testing;

pub use analyst::{AnalystStats, CommentaryModel, GeminiModel, MarketAnalyst};
pub use cache::{CacheStats, RateCache, RateCacheConfig, RateQuote};
pub use commentary::synthesize;
pub use conversion::{ConversionRequest, ConversionResult};
pub use engine::{ConversionEngine, EngineConfig, EngineStats, CACHE_SOURCE};
pub use error::{FxError, FxResult};
pub use provider::{parse_rate, HttpRateProvider, RateProvider};
