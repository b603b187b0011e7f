//! Speech processing traits

use crate::{Result, TranslateOptions, TranslationResult, Waveform};
use async_trait::async_trait;

/// Text-to-Speech interface
///
/// Callers pass raw-but-trimmed text; text normalization is the
/// implementation's job, since it is part of the acoustic model's front-end.
///
/// # Example
///
/// ```ignore
/// let tts: Arc<dyn TextToSpeech> = Arc::new(Synthesizer::new(model, normalizer));
/// let wav = tts.synthesize("नमस्ते").await?;
/// assert_eq!(wav.sample_rate, tts.sample_rate());
/// ```
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text to a waveform
    ///
    /// Fails with [`crate::Error::Synthesis`] if the model errors or
    /// returns no samples.
    async fn synthesize(&self, text: &str) -> Result<Waveform>;

    /// Fixed output sample rate of the underlying model
    fn sample_rate(&self) -> u32;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// English → Nepali translation interface
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translate English text
    ///
    /// Blank input yields an empty [`TranslationResult`] without touching the
    /// model. Fails with [`crate::Error::Translation`] if generation produced
    /// no output, or [`crate::Error::ModelLoad`] if lazy loading failed.
    async fn translate(&self, text: &str, options: &TranslateOptions)
        -> Result<TranslationResult>;

    /// Get translator name for logging
    fn name(&self) -> &str;
}
