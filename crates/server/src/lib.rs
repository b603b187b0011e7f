//! Nepali TTS Server
//!
//! HTTP endpoints for Nepali text-to-speech and English-to-Nepali speech.

pub mod client;
pub mod error;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod speech;
pub mod state;

pub use client::ClientKey;
pub use error::ApiError;
pub use http::create_router;
pub use metrics::init_metrics;
pub use rate_limit::{RateDecision, RateLimiter, RateWindow};
pub use speech::{Endpoint, SpeechPipeline};
pub use state::{build_state, AppState};

use thiserror::Error;

/// Startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Cache error: {0}")]
    Cache(String),
}
