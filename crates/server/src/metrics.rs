//! Prometheus metrics

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

pub const REQUESTS_TOTAL: &str = "tts_requests_total";
pub const CACHE_TOTAL: &str = "tts_cache_total";
pub const SYNTHESIS_SECONDS: &str = "tts_synthesis_seconds";
pub const TRANSLATION_SECONDS: &str = "tts_translation_seconds";
pub const RATE_LIMITED_TOTAL: &str = "tts_rate_limited_total";

/// Install the global Prometheus recorder.
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            None
        }
    }
}

pub fn record_request(endpoint: &'static str, status: StatusCode) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

pub fn record_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(CACHE_TOTAL, "result" => result).increment(1);
}

pub fn record_synthesis_latency(elapsed: Duration) {
    metrics::histogram!(SYNTHESIS_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_translation_latency(elapsed: Duration) {
    metrics::histogram!(TRANSLATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!(RATE_LIMITED_TOTAL).increment(1);
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
