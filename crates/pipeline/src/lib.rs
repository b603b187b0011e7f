//! Speech synthesis pipeline
//!
//! - [`tts`]: the acoustic model binding and the [`tts::Synthesizer`] that
//!   puts the text front-end in front of it
//! - [`cache`]: content-addressed WAV cache with atomic writes

pub mod cache;
pub mod tts;

pub use cache::{cache_key, AudioCache, CacheStatus, CachedAudio};
pub use tts::{AcousticModel, HttpAcousticModel, HttpTtsConfig, Synthesizer};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("WAV encoding error: {0}")]
    Encoding(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for nepali_tts_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ModelLoad(msg) => nepali_tts_core::Error::ModelLoad(msg),
            PipelineError::Model(msg) => nepali_tts_core::Error::Synthesis(msg),
            PipelineError::Cache(msg) => nepali_tts_core::Error::Cache(msg),
            PipelineError::Encoding(e) => nepali_tts_core::Error::Cache(e.to_string()),
            PipelineError::Io(e) => nepali_tts_core::Error::Io(e),
        }
    }
}
