//! Error types shared across the service crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Acoustic model failed or produced nothing
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Translation model failed or produced nothing
    #[error("Translation error: {0}")]
    Translation(String),

    /// A pretrained model could not be loaded or reached
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }
}
