//! Gateway assembly: engine wiring, middleware and serving.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use fxbrief_fx::{
    ConversionEngine, EngineConfig, GeminiModel, HttpRateProvider, MarketAnalyst, RateCacheConfig,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::{Environment, GatewayConfig};
use crate::routes::router;
use crate::state::AppState;

/// HTTP gateway around a conversion engine.
pub struct Gateway {
    config: GatewayConfig,
    state: AppState,
}

impl Gateway {
    /// Wire the engine and its outbound clients from configuration.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        let provider = HttpRateProvider::new(client.clone(), config.rate_provider_url.clone())
            .with_timeout(config.upstream_timeout);

        let analyst = match &config.commentary.api_key {
            Some(key) => {
                let model = GeminiModel::new(client, key.clone())
                    .with_model(config.commentary.model.clone())
                    .with_timeout(config.upstream_timeout);
                MarketAnalyst::new(Arc::new(model))
            }
            None => {
                warn!("No commentary API key configured, using templated analysis only");
                MarketAnalyst::fallback_only()
            }
        };

        let engine_config = EngineConfig {
            cache: RateCacheConfig {
                default_ttl: chrono::Duration::from_std(config.cache_ttl)?,
                ..Default::default()
            },
        };

        let engine = ConversionEngine::new(Arc::new(provider), analyst, engine_config);
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// Build a gateway around an existing engine.
    pub fn with_engine(config: GatewayConfig, engine: Arc<ConversionEngine>) -> Self {
        Self {
            config,
            state: AppState::new(engine),
        }
    }

    /// Handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Router with CORS, request tracing and optional static files.
    pub fn app(&self) -> Router {
        let mut app = router(self.state.clone());

        if let Some(dir) = &self.config.static_dir {
            app = app.fallback_service(ServeDir::new(dir));
        }

        app.layer(cors_layer(&self.config)).layer(TraceLayer::new_for_http())
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr =
            format!("{}:{}", self.config.listen_addr, self.config.listen_port).parse()?;

        self.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            listen = %addr,
            provider = self.state.engine.provider_name(),
            "Gateway listening"
        );

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Gateway shutdown complete");
        Ok(())
    }

    fn start_background_tasks(&self) {
        let engine = self.state.engine.clone();
        let interval = self.config.cache_sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = engine.cleanup();
                if evicted > 0 {
                    debug!(evicted, "Swept expired quotes");
                }
            }
        });
    }
}

/// CORS policy: any origin in development, the configured origin in
/// production, none otherwise.
pub fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    match config.environment {
        Environment::Development => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        Environment::Production => {
            match config
                .cors_origin
                .as_deref()
                .and_then(|o| HeaderValue::from_str(o).ok())
            {
                Some(origin) => CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods(Any)
                    .allow_headers(Any),
                None => CorsLayer::new().allow_methods(Any),
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
