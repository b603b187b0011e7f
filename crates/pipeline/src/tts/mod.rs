//! Text-to-speech
//!
//! [`Synthesizer`] owns the text front-end and a single acoustic model
//! instance. Callers hand it trimmed text; it normalizes, runs the model
//! and returns the raw waveform. Loudness and encoding belong to the cache.

mod http_backend;

pub use http_backend::{HttpAcousticModel, HttpTtsConfig};

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use nepali_tts_core::{Error, Result as CoreResult, TextToSpeech, Waveform};
use nepali_tts_text_processing::TextNormalizer;

use crate::PipelineError;

/// Binding to a loaded acoustic model
///
/// The model is assumed not to be safe for concurrent inference, hence
/// `&mut self`. The sample rate is fixed for the life of the binding.
#[async_trait]
pub trait AcousticModel: Send + 'static {
    /// Produce mono f32 samples for already-normalized text
    async fn infer(&mut self, text: &str) -> Result<Vec<f32>, PipelineError>;

    fn sample_rate(&self) -> u32;

    fn name(&self) -> &str;
}

/// Normalizing synthesizer over one shared acoustic model
pub struct Synthesizer {
    model: Mutex<Box<dyn AcousticModel>>,
    normalizer: TextNormalizer,
    add_sentence_end: bool,
    sample_rate: u32,
    name: String,
}

impl Synthesizer {
    pub fn new(
        model: Box<dyn AcousticModel>,
        normalizer: TextNormalizer,
        add_sentence_end: bool,
    ) -> Self {
        let sample_rate = model.sample_rate();
        let name = model.name().to_string();
        Self {
            model: Mutex::new(model),
            normalizer,
            add_sentence_end,
            sample_rate,
            name,
        }
    }
}

#[async_trait]
impl TextToSpeech for Synthesizer {
    async fn synthesize(&self, text: &str) -> CoreResult<Waveform> {
        let normalized = self.normalizer.normalize(text, self.add_sentence_end);
        if normalized.is_empty() {
            return Err(Error::synthesis("nothing to synthesize after normalization"));
        }

        let start = Instant::now();
        let samples = {
            let mut model = self.model.lock().await;
            model.infer(&normalized).await?
        };

        if samples.is_empty() {
            return Err(Error::synthesis("acoustic model produced no samples"));
        }

        let waveform = Waveform::new(samples, self.sample_rate);
        tracing::debug!(
            chars = normalized.chars().count(),
            samples = waveform.len(),
            duration_ms = waveform.duration_ms(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Synthesized"
        );

        Ok(waveform)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    struct RecordingModel {
        seen: Arc<StdMutex<Vec<String>>>,
        output: Vec<f32>,
    }

    #[async_trait]
    impl AcousticModel for RecordingModel {
        async fn infer(&mut self, text: &str) -> Result<Vec<f32>, PipelineError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.output.clone())
        }

        fn sample_rate(&self) -> u32 {
            22050
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl AcousticModel for FailingModel {
        async fn infer(&mut self, _text: &str) -> Result<Vec<f32>, PipelineError> {
            Err(PipelineError::Model("out of memory".into()))
        }

        fn sample_rate(&self) -> u32 {
            16000
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn synthesizer(output: Vec<f32>, add_sentence_end: bool) -> (Synthesizer, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let model = RecordingModel {
            seen: seen.clone(),
            output,
        };
        (
            Synthesizer::new(Box::new(model), TextNormalizer::default(), add_sentence_end),
            seen,
        )
    }

    #[tokio::test]
    async fn test_normalizes_before_inference() {
        let (tts, seen) = synthesizer(vec![0.1, 0.2], false);
        let wav = tts.synthesize("  “Namaste”   साथी ").await.unwrap();

        assert_eq!(tts.model_name(), "recording");
        assert_eq!(wav.sample_rate, 22050);
        assert_eq!(wav.samples, vec![0.1, 0.2]);
        assert_eq!(seen.lock().unwrap().as_slice(), ["\"namaste\" साथी"]);
    }

    #[tokio::test]
    async fn test_sentence_end_added_when_enabled() {
        let (tts, seen) = synthesizer(vec![0.1], true);
        tts.synthesize("नमस्ते").await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["नमस्ते।"]);
    }

    #[tokio::test]
    async fn test_empty_output_is_error() {
        let (tts, _) = synthesizer(vec![], false);
        let err = tts.synthesize("नमस्ते").await.unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_blank_after_normalization_is_error() {
        let (tts, seen) = synthesizer(vec![0.1], true);
        let err = tts.synthesize("\u{200C}\u{200D}").await.unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_maps_to_synthesis_error() {
        let tts = Synthesizer::new(Box::new(FailingModel), TextNormalizer::default(), false);
        assert_eq!(tts.sample_rate(), 16000);
        let err = tts.synthesize("नमस्ते").await.unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
    }
}
