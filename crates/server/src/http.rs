//! HTTP Endpoints
//!
//! - `GET /api/health`
//! - `POST /api/tts` Nepali text → WAV
//! - `POST /api/tts-english` English text → Nepali WAV
//! - `GET /metrics` Prometheus exposition

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::ClientKey;
use crate::error::ApiError;
use crate::metrics::{metrics_handler, record_request};
use crate::speech::Endpoint;
use crate::state::AppState;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.allowed_origin);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tts", post(tts))
        .route("/api/tts-english", post(tts_english))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// CORS for the single allowed origin
fn build_cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::RETRY_AFTER, X_CACHE, X_CACHE_KEY]);

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin = %origin, "Invalid allowed origin, CORS will reject all origins");
            layer
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "ok": true,
        "sample_rate": state.speech.sample_rate(),
    }))
}

async fn tts(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    speak(state, Endpoint::Tts, client, headers, body).await
}

async fn tts_english(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    speak(state, Endpoint::TtsEnglish, client, headers, body).await
}

async fn speak(
    state: AppState,
    endpoint: Endpoint,
    client: ClientKey,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let text = request_text(&body);

    let result = match state.speech.handle(endpoint, origin, &client, &text).await {
        Ok(audio) => match tokio::fs::File::open(&audio.path).await {
            Ok(file) => Ok((
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
                    (X_CACHE, HeaderValue::from_static(audio.status.as_str())),
                    (
                        X_CACHE_KEY,
                        HeaderValue::from_str(&audio.key)
                            .unwrap_or_else(|_| HeaderValue::from_static("invalid")),
                    ),
                ],
                Body::from_stream(ReaderStream::new(file)),
            )
                .into_response()),
            Err(e) => Err(ApiError::Internal(format!(
                "Failed to open {}: {}",
                audio.path.display(),
                e
            ))),
        },
        Err(e) => Err(e),
    };

    let response = result.unwrap_or_else(IntoResponse::into_response);
    record_request(endpoint.as_str(), response.status());
    response
}

/// Pull `text` out of a request body without ever failing.
///
/// Invalid JSON or a non-object body counts as `{}`. A missing or null
/// `text` is empty; any other non-string value is used as its JSON text.
fn request_text(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    match value.get("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_text_lenient() {
        assert_eq!(request_text(br#"{"text": "namaste"}"#), "namaste");
        assert_eq!(request_text(br#"{"text": null}"#), "");
        assert_eq!(request_text(br#"{"other": 1}"#), "");
        assert_eq!(request_text(b"not json"), "");
        assert_eq!(request_text(b""), "");
        assert_eq!(request_text(br#"["text"]"#), "");
        assert_eq!(request_text(br#"{"text": 5}"#), "5");
    }

    #[test]
    fn test_cors_layer_builds_for_bad_origin() {
        let _ = build_cors_layer("not a header\nvalue");
        let _ = build_cors_layer("http://localhost:5173");
    }
}
