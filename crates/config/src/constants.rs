//! Centralized defaults
//!
//! Single source of truth for default values used by the settings tree and
//! by callers that need the same numbers (tests, CLI help).

/// Request limits
pub mod limits {
    /// Maximum characters accepted per request (after trimming)
    pub const MAX_CHARS: usize = 300;
}

/// Rate limiting defaults
pub mod rate_limit {
    pub const MAX_REQUESTS: u32 = 20;
    pub const WINDOW_SECONDS: u64 = 60;
    pub const EVICTION_INTERVAL_SECONDS: u64 = 300;
}

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 4000;
    /// Local frontend dev server
    pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";
}

/// Audio cache defaults
pub mod cache {
    pub const DIR: &str = "outputs";
    /// Hex characters of the SHA-256 digest kept in the file name
    pub const KEY_LENGTH: usize = 16;
    pub const HEADROOM: f32 = 0.98;
}

/// Model sidecar endpoints (defaults for local development)
pub mod endpoints {
    pub const TTS_DEFAULT: &str = "http://127.0.0.1:5002";
    pub const TRANSLATION_DEFAULT: &str = "http://127.0.0.1:5003";
}

/// Pretrained model defaults
pub mod models {
    pub const TTS_CHECKPOINT: &str = "models/best_model.pth";
    pub const TTS_CONFIG: &str = "models/config.json";
    pub const TTS_DEVICE: &str = "cpu";
    pub const TIMEOUT_SECONDS: u64 = 120;
    pub const TRANSLATION_MODEL_ID: &str = "facebook/nllb-200-distilled-600M";
    pub const MAX_NEW_TOKENS: usize = 256;
    pub const NUM_BEAMS: usize = 4;
}
