//! fxbrief Gateway Binary
//!
//! Serves currency conversions with cached quotes and market commentary.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxbrief_gateway::{Gateway, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fxbrief gateway");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    info!(
        environment = ?config.environment,
        listen_addr = %config.listen_addr,
        listen_port = config.listen_port,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        commentary_model = config.commentary.api_key.as_ref().map(|_| config.commentary.model.as_str()),
        "Configuration loaded"
    );

    Gateway::new(config)?.run().await
}
