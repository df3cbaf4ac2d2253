//! fxbrief Gateway
//!
//! HTTP front end for the conversion engine: `POST /api/convert`,
//! `GET /health` and `GET /metrics`.

pub mod config;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::GatewayConfig;
pub use server::Gateway;
