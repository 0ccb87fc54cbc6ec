pub(crate) mod analyze;
pub(crate) mod health;
pub(crate) mod metrics;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::heartbeat))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/analyze", post(analyze::analyze))
        .with_state(state)
}
