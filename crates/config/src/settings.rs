//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{cache, endpoints, limits, models, rate_limit, server};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Input limits and text front-end options
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Audio cache location
    #[serde(default)]
    pub cache: CacheConfig,

    /// Acoustic model sidecar
    #[serde(default)]
    pub models: ModelConfig,

    /// Translation model sidecar
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_speech()?;
        self.validate_cache()?;
        self.validate_translation()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        let origin = server.allowed_origin.trim();
        if origin.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.allowed_origin".to_string(),
                message: "Allowed origin must be set".to_string(),
            });
        }
        if !(origin.starts_with("http://") || origin.starts_with("https://"))
            || origin.ends_with('/')
        {
            return Err(ConfigError::InvalidValue {
                field: "server.allowed_origin".to_string(),
                message: format!(
                    "Expected scheme://host[:port] with no trailing slash, got '{}'",
                    origin
                ),
            });
        }

        let rate_limit = &server.rate_limit;
        if rate_limit.enabled {
            if rate_limit.max_requests == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "server.rate_limit.max_requests".to_string(),
                    message: "Must be at least 1 when rate limiting is enabled".to_string(),
                });
            }
            if rate_limit.window_seconds == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "server.rate_limit.window_seconds".to_string(),
                    message: "Must be at least 1 when rate limiting is enabled".to_string(),
                });
            }
            if rate_limit.eviction_interval_seconds == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "server.rate_limit.eviction_interval_seconds".to_string(),
                    message: "Must be at least 1 when rate limiting is enabled".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_speech(&self) -> Result<(), ConfigError> {
        if self.speech.max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "speech.max_chars".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        let headroom = self.speech.headroom;
        if !(headroom > 0.0 && headroom <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "speech.headroom".to_string(),
                message: format!("Must be in (0.0, 1.0], got {}", headroom),
            });
        }

        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache.dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.dir".to_string(),
                message: "Cache directory must be set".to_string(),
            });
        }

        if !(8..=64).contains(&self.cache.key_length) {
            return Err(ConfigError::InvalidValue {
                field: "cache.key_length".to_string(),
                message: format!("Must be between 8 and 64, got {}", self.cache.key_length),
            });
        }

        Ok(())
    }

    fn validate_translation(&self) -> Result<(), ConfigError> {
        if self.translation.max_new_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translation.max_new_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.translation.num_beams == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translation.num_beams".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if let Some(device) = &self.translation.device {
            let known = ["mps", "cuda", "gpu", "cpu"];
            if !known.contains(&device.trim().to_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "translation.device".to_string(),
                    message: format!("Unknown device '{}', expected one of {:?}", device, known),
                });
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// The only `Origin` header value accepted on speech endpoints
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    server::HOST.to_string()
}
fn default_port() -> u16 {
    server::PORT
}
fn default_allowed_origin() -> String {
    server::ALLOWED_ORIGIN.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Fixed-window rate limiting, per client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// How often expired windows are swept from memory
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_seconds: u64,
}

fn default_max_requests() -> u32 {
    rate_limit::MAX_REQUESTS
}
fn default_window_seconds() -> u64 {
    rate_limit::WINDOW_SECONDS
}
fn default_eviction_interval() -> u64 {
    rate_limit::EVICTION_INTERVAL_SECONDS
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            eviction_interval_seconds: default_eviction_interval(),
        }
    }
}

/// Input limits and text front-end options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Maximum characters per request, counted after trimming
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Append a danda when the text has no terminal punctuation
    #[serde(default)]
    pub add_sentence_end: bool,

    /// Rewrite rare letters (ॠ → ऋ, ॥ → ।) during normalization
    #[serde(default = "default_true")]
    pub fold_rare_characters: bool,

    /// Gain applied after peak normalization
    #[serde(default = "default_headroom")]
    pub headroom: f32,
}

fn default_max_chars() -> usize {
    limits::MAX_CHARS
}
fn default_headroom() -> f32 {
    cache::HEADROOM
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            add_sentence_end: false,
            fold_rare_characters: true,
            headroom: default_headroom(),
        }
    }
}

/// Audio cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory of `<key>.wav` files
    #[serde(default = "default_cache_dir")]
    pub dir: String,

    /// Hex characters of the digest used as the file name
    #[serde(default = "default_key_length")]
    pub key_length: usize,
}

fn default_cache_dir() -> String {
    cache::DIR.to_string()
}
fn default_key_length() -> usize {
    cache::KEY_LENGTH
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            key_length: default_key_length(),
        }
    }
}

/// Acoustic model sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the TTS inference service
    #[serde(default = "default_tts_endpoint")]
    pub tts_endpoint: String,

    /// Checkpoint path handed to the service at load time
    #[serde(default = "default_tts_checkpoint")]
    pub tts_checkpoint: String,

    /// Model config path handed to the service at load time
    #[serde(default = "default_tts_config")]
    pub tts_config: String,

    /// Inference device; this deployment is CPU-only
    #[serde(default = "default_tts_device")]
    pub tts_device: String,

    /// Per-request timeout for model calls
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

fn default_tts_endpoint() -> String {
    endpoints::TTS_DEFAULT.to_string()
}
fn default_tts_checkpoint() -> String {
    models::TTS_CHECKPOINT.to_string()
}
fn default_tts_config() -> String {
    models::TTS_CONFIG.to_string()
}
fn default_tts_device() -> String {
    models::TTS_DEVICE.to_string()
}
fn default_model_timeout() -> u64 {
    models::TIMEOUT_SECONDS
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tts_endpoint: default_tts_endpoint(),
            tts_checkpoint: default_tts_checkpoint(),
            tts_config: default_tts_config(),
            tts_device: default_tts_device(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

/// Translation model sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base URL of the translation inference service
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    /// Hugging Face model id loaded by the service
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Preferred device (`mps`, `cuda`, `cpu`); auto-selected when unset
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    #[serde(default = "default_num_beams")]
    pub num_beams: usize,

    /// Load the model at startup instead of on first use
    #[serde(default = "default_true")]
    pub preload: bool,
}

fn default_translation_endpoint() -> String {
    endpoints::TRANSLATION_DEFAULT.to_string()
}
fn default_model_id() -> String {
    models::TRANSLATION_MODEL_ID.to_string()
}
fn default_max_new_tokens() -> usize {
    models::MAX_NEW_TOKENS
}
fn default_num_beams() -> usize {
    models::NUM_BEAMS
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            model_id: default_model_id(),
            device: None,
            max_new_tokens: default_max_new_tokens(),
            num_beams: default_num_beams(),
            preload: true,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Flat environment variables kept for compatibility with existing
/// deployments: (variable, settings key, numeric)
const FLAT_ENV_VARS: &[(&str, &str, bool)] = &[
    ("MAX_CHARS", "speech.max_chars", true),
    ("PORT", "server.port", true),
    ("ALLOWED_ORIGIN", "server.allowed_origin", false),
    ("RATE_LIMIT_MAX_REQUESTS", "server.rate_limit.max_requests", true),
    ("RATE_LIMIT_WINDOW_SECONDS", "server.rate_limit.window_seconds", true),
    ("CACHE_DIR", "cache.dir", false),
];

/// Collect overrides from the flat environment variables.
///
/// `lookup` abstracts `std::env::var` so the mapping can be exercised
/// without touching the process environment.
pub fn flat_env_overrides<F>(lookup: F) -> Result<Vec<(&'static str, String)>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = Vec::new();

    for &(var, key, numeric) in FLAT_ENV_VARS {
        let Some(raw) = lookup(var) else { continue };
        let value = raw.trim().to_string();

        if numeric && value.parse::<u64>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: var.to_string(),
                message: format!("Expected a non-negative integer, got '{}'", raw),
            });
        }

        overrides.push((key, value));
    }

    Ok(overrides)
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Flat variables (`MAX_CHARS`, `PORT`, `ALLOWED_ORIGIN`, ...)
/// 2. Environment variables (`NEPALI_TTS__SECTION__KEY`)
/// 3. config/{env}.yaml (if env specified)
/// 4. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("NEPALI_TTS")
            .separator("__")
            .try_parsing(true),
    );

    for (key, value) in flat_env_overrides(|var| std::env::var(var).ok())? {
        builder = builder.set_override(key, value)?;
    }

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}
