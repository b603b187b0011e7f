//! Configuration management for the Nepali speech service
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (`NEPALI_TTS__` prefix)
//! - Flat legacy variables (`MAX_CHARS`, `PORT`, `ALLOWED_ORIGIN`, ...)

pub mod constants;
pub mod settings;

pub use settings::{
    flat_env_overrides, load_settings, CacheConfig, ModelConfig, ObservabilityConfig,
    RateLimitConfig, ServerConfig, Settings, SpeechConfig, TranslationConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
