//! API error responses
//!
//! Every failure leaves the server as `{"error": "<kind>"}` JSON with a
//! fixed status. No partial audio is ever sent.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Origin not allowed")]
    OriginRejected,

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Missing text")]
    MissingText,

    #[error("Text longer than {max_chars} characters")]
    TextTooLong { max_chars: usize },

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable kind sent as the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::OriginRejected => "origin_not_allowed",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::MissingText => "missing_text",
            ApiError::TextTooLong { .. } => "text_too_long",
            ApiError::TranslationFailed(_) => "translation_failed",
            ApiError::SynthesisFailed(_) => "synthesis_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::OriginRejected => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingText | ApiError::TextTooLong { .. } => StatusCode::BAD_REQUEST,
            ApiError::TranslationFailed(_)
            | ApiError::SynthesisFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), "Request rejected");
        }

        let body = match &self {
            ApiError::RateLimited { retry_after } => {
                json!({ "error": self.kind(), "retry_after": retry_after })
            }
            ApiError::TextTooLong { max_chars } => {
                json!({ "error": self.kind(), "max_chars": max_chars })
            }
            _ => json!({ "error": self.kind() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}
