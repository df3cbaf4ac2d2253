//! Gateway configuration.

use std::time::Duration;

use fxbrief_common::{constants, DurationExt};
use fxbrief_fx::analyst::DEFAULT_GEMINI_MODEL;
use fxbrief_fx::provider::FRANKFURTER_URL;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Listen port cannot be 0")]
    ZeroPort,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Rate provider URL cannot be empty")]
    EmptyRateProviderUrl,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse an environment tag. Anything other than `production` is
    /// treated as development.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// Commentary model configuration.
#[derive(Debug, Clone)]
pub struct CommentaryConfig {
    /// API key for the generative model. Without one, templated commentary
    /// is always used.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Main gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// Allowed cross-origin caller in production.
    pub cors_origin: Option<String>,
    /// Commentary model configuration.
    pub commentary: CommentaryConfig,
    /// Live rate endpoint.
    pub rate_provider_url: String,
    /// Bound on each outbound call.
    pub upstream_timeout: Duration,
    /// How long a quote is served from cache.
    pub cache_ttl: Duration,
    /// Interval between sweeps of expired quotes.
    pub cache_sweep_interval: Duration,
    /// Directory served for non-API paths.
    pub static_dir: Option<String>,
    /// Log level.
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 3000,
            environment: Environment::Development,
            cors_origin: None,
            commentary: CommentaryConfig::default(),
            rate_provider_url: FRANKFURTER_URL.to_string(),
            upstream_timeout: constants::upstream_timeout().as_std(),
            cache_ttl: constants::quote_ttl().as_std(),
            cache_sweep_interval: constants::cache_sweep_interval().as_std(),
            static_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("GATEWAY_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            config.listen_port = port;
        }

        if let Some(env) = lookup("APP_ENV") {
            config.environment = Environment::from_tag(&env);
        }

        config.cors_origin = lookup("CORS_ORIGIN").filter(|o| !o.trim().is_empty());
        config.commentary.api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());

        if let Some(model) = lookup("GEMINI_MODEL") {
            config.commentary.model = model;
        }

        if let Some(url) = lookup("RATE_PROVIDER_URL") {
            config.rate_provider_url = url;
        }

        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.upstream_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = lookup("CACHE_TTL_SECS").and_then(|s| s.parse().ok()) {
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = lookup("CACHE_SWEEP_SECS").and_then(|s| s.parse().ok()) {
            config.cache_sweep_interval = Duration::from_secs(secs);
        }

        config.static_dir = lookup("STATIC_DIR").filter(|d| !d.trim().is_empty());

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_port == 0 {
            return Err(ConfigError::ZeroPort);
        }

        if self.upstream_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("Upstream timeout"));
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration("Cache TTL"));
        }

        if self.cache_sweep_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("Cache sweep interval"));
        }

        if self.rate_provider_url.trim().is_empty() {
            return Err(ConfigError::EmptyRateProviderUrl);
        }

        Ok(())
    }
}
