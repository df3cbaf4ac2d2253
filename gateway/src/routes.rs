//! HTTP routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fxbrief_common::{now, Timestamp};
use fxbrief_fx::{AnalystStats, CacheStats, ConversionRequest, ConversionResult, FxError};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/convert", post(convert))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Error body returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Error surfaced by a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    /// Body could not be read as JSON.
    pub fn invalid_request(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INV-REQ".to_string(),
            message: rejection.body_text(),
        }
    }
}

impl From<FxError> for ApiError {
    fn from(err: FxError) -> Self {
        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// POST /api/convert
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConversionRequest>, JsonRejection>,
) -> Result<Json<ConversionResult>, ApiError> {
    state.metrics.conversion_received();

    let Json(request) = payload.map_err(|rejection| {
        state.metrics.conversion_rejected();
        ApiError::invalid_request(rejection)
    })?;

    match state.engine.convert(request).await {
        Ok(result) => {
            state.metrics.conversion_success();
            Ok(Json(result))
        }
        Err(e) => {
            if e.is_client_error() {
                state.metrics.conversion_rejected();
            } else {
                warn!(error = %e, code = %e.error_code(), "Conversion failed");
                state.metrics.conversion_failed();
            }
            Err(e.into())
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since startup.
    pub uptime: f64,
    pub timestamp: Timestamp,
    pub cache_stats: CacheStats,
    pub commentary: AnalystStats,
    pub metrics: MetricsSnapshot,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.engine.stats();

    Json(HealthResponse {
        status: "OK",
        uptime: state.uptime_secs(),
        timestamp: now(),
        cache_stats: stats.cache,
        commentary: stats.commentary,
        metrics: state.metrics.snapshot(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.to_prometheus(&state.engine.stats());
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
