//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use fxbrief_fx::ConversionEngine;

use crate::metrics::GatewayMetrics;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversionEngine>,
    pub metrics: Arc<GatewayMetrics>,
    started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ConversionEngine>) -> Self {
        Self {
            engine,
            metrics: Arc::new(GatewayMetrics::new()),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
