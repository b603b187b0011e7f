//! Request pipeline for the speech endpoints
//!
//! ```text
//! origin check → rate check → validate → [translate → validate] → cache or synthesize
//! ```
//!
//! Every failure is terminal for the request. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use nepali_tts_core::{Error as CoreError, TextToSpeech, TranslateOptions, Translator};
use nepali_tts_pipeline::{AudioCache, CacheStatus, CachedAudio};

use crate::client::ClientKey;
use crate::error::ApiError;
use crate::metrics;
use crate::rate_limit::RateLimiter;

/// Which speech endpoint a request came in on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Nepali text straight to speech
    Tts,
    /// English text, translated to Nepali first
    TtsEnglish,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Tts => "tts",
            Endpoint::TtsEnglish => "tts_english",
        }
    }

    fn translates(&self) -> bool {
        matches!(self, Endpoint::TtsEnglish)
    }
}

pub struct SpeechPipeline {
    allowed_origin: String,
    max_chars: usize,
    translate_options: TranslateOptions,
    rate_limiter: Arc<RateLimiter>,
    tts: Arc<dyn TextToSpeech>,
    translator: Arc<dyn Translator>,
    cache: Arc<AudioCache>,
}

impl SpeechPipeline {
    pub fn new(
        allowed_origin: impl Into<String>,
        max_chars: usize,
        translate_options: TranslateOptions,
        rate_limiter: Arc<RateLimiter>,
        tts: Arc<dyn TextToSpeech>,
        translator: Arc<dyn Translator>,
        cache: Arc<AudioCache>,
    ) -> Self {
        Self {
            allowed_origin: allowed_origin.into(),
            max_chars,
            translate_options,
            rate_limiter,
            tts,
            translator,
            cache,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.tts.sample_rate()
    }

    /// Run one request through the pipeline and return the audio file handle
    pub async fn handle(
        &self,
        endpoint: Endpoint,
        origin: Option<&str>,
        client: &ClientKey,
        text: &str,
    ) -> Result<CachedAudio, ApiError> {
        self.check_origin(origin)?;
        self.check_rate(client)?;

        let text = self.validate(text)?;

        let translated;
        let final_text = if endpoint.translates() {
            translated = self.translate(text).await?;
            self.validate(&translated)?
        } else {
            text
        };

        self.speak(final_text).await
    }

    fn check_origin(&self, origin: Option<&str>) -> Result<(), ApiError> {
        match origin {
            Some(origin) if origin == self.allowed_origin => Ok(()),
            _ => {
                tracing::debug!(origin = ?origin, "Origin rejected");
                Err(ApiError::OriginRejected)
            }
        }
    }

    fn check_rate(&self, client: &ClientKey) -> Result<(), ApiError> {
        let decision = self.rate_limiter.admit(client.as_str());
        if decision.allowed {
            return Ok(());
        }

        metrics::record_rate_limited();
        tracing::info!(
            client = %client,
            retry_after = decision.retry_after_secs,
            "Rate limited"
        );
        Err(ApiError::RateLimited {
            retry_after: decision.retry_after_secs,
        })
    }

    /// Trim and check length in characters
    fn validate<'a>(&self, text: &'a str) -> Result<&'a str, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::MissingText);
        }
        if text.chars().count() > self.max_chars {
            return Err(ApiError::TextTooLong {
                max_chars: self.max_chars,
            });
        }
        Ok(text)
    }

    async fn translate(&self, text: &str) -> Result<String, ApiError> {
        let start = Instant::now();
        let result = self
            .translator
            .translate(text, &self.translate_options)
            .await
            .map_err(|e| ApiError::TranslationFailed(e.to_string()))?;
        let elapsed = start.elapsed();
        metrics::record_translation_latency(elapsed);

        if result.is_blank() {
            return Err(ApiError::TranslationFailed(
                "translator produced empty output".to_string(),
            ));
        }

        tracing::debug!(
            model = %result.model_id,
            chars_in = text.chars().count(),
            chars_out = result.text.chars().count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Translation complete"
        );
        Ok(result.text)
    }

    async fn speak(&self, text: &str) -> Result<CachedAudio, ApiError> {
        let tts = &self.tts;

        let audio = self
            .cache
            .get_or_create(text, move || async move {
                let start = Instant::now();
                let waveform = tts.synthesize(text).await?;
                metrics::record_synthesis_latency(start.elapsed());
                Ok(waveform)
            })
            .await
            .map_err(|e| match e {
                CoreError::Synthesis(_) | CoreError::ModelLoad(_) => {
                    ApiError::SynthesisFailed(e.to_string())
                }
                other => ApiError::Internal(other.to_string()),
            })?;

        metrics::record_cache(audio.status == CacheStatus::Hit);
        tracing::info!(
            cache_key = %audio.key,
            cache = audio.status.as_str(),
            chars = text.chars().count(),
            "Speech ready"
        );

        Ok(audio)
    }
}
