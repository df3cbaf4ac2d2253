//! Metrics collection for gateway monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

use fxbrief_fx::EngineStats;
use serde::Serialize;

/// Gateway request metrics.
pub struct GatewayMetrics {
    /// Conversion requests received.
    pub conversions_total: AtomicU64,
    /// Conversions answered successfully.
    pub conversions_success: AtomicU64,
    /// Conversions rejected for bad input.
    pub conversions_rejected: AtomicU64,
    /// Conversions failed upstream.
    pub conversions_failed: AtomicU64,
}

impl GatewayMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            conversions_total: AtomicU64::new(0),
            conversions_success: AtomicU64::new(0),
            conversions_rejected: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
        }
    }

    /// Increment conversion received.
    pub fn conversion_received(&self) {
        self.conversions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record conversion success.
    pub fn conversion_success(&self) {
        self.conversions_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record conversion rejection.
    pub fn conversion_rejected(&self) {
        self.conversions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record conversion failure.
    pub fn conversion_failed(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            conversions_total: self.conversions_total.load(Ordering::Relaxed),
            conversions_success: self.conversions_success.load(Ordering::Relaxed),
            conversions_rejected: self.conversions_rejected.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format, engine counters included.
    pub fn to_prometheus(&self, engine: &EngineStats) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP fxbrief_conversions_total Total conversion requests
# TYPE fxbrief_conversions_total counter
fxbrief_conversions_total {}

# HELP fxbrief_conversions_success Conversions answered successfully
# TYPE fxbrief_conversions_success counter
fxbrief_conversions_success {}

# HELP fxbrief_conversions_rejected Conversions rejected for invalid input
# TYPE fxbrief_conversions_rejected counter
fxbrief_conversions_rejected {}

# HELP fxbrief_conversions_failed Conversions failed at the rate provider
# TYPE fxbrief_conversions_failed counter
fxbrief_conversions_failed {}

# HELP fxbrief_cache_hits Quote cache hits
# TYPE fxbrief_cache_hits counter
fxbrief_cache_hits {}

# HELP fxbrief_cache_misses Quote cache misses
# TYPE fxbrief_cache_misses counter
fxbrief_cache_misses {}

# HELP fxbrief_cache_entries Quotes currently cached
# TYPE fxbrief_cache_entries gauge
fxbrief_cache_entries {}

# HELP fxbrief_commentary_generated Commentary produced by the model
# TYPE fxbrief_commentary_generated counter
fxbrief_commentary_generated {}

# HELP fxbrief_commentary_fallbacks Commentary produced from the template
# TYPE fxbrief_commentary_fallbacks counter
fxbrief_commentary_fallbacks {}
"#,
            snapshot.conversions_total,
            snapshot.conversions_success,
            snapshot.conversions_rejected,
            snapshot.conversions_failed,
            engine.cache.hits,
            engine.cache.misses,
            engine.cache.total_entries,
            engine.commentary.generated,
            engine.commentary.fallbacks,
        )
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub conversions_total: u64,
    pub conversions_success: u64,
    pub conversions_rejected: u64,
    pub conversions_failed: u64,
}
