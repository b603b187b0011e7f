//! Application State
//!
//! Shared state across all handlers. Every long-lived service is built
//! once here and handed to the handlers by reference.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use nepali_tts_config::Settings;
use nepali_tts_core::{TextToSpeech, TranslateOptions, Translator};
use nepali_tts_pipeline::{AudioCache, HttpAcousticModel, HttpTtsConfig, Synthesizer};
use nepali_tts_text_processing::{create_translator, Device, HttpTranslatorConfig, TextNormalizer};

use crate::rate_limit::RateLimiter;
use crate::speech::SpeechPipeline;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub speech: Arc<SpeechPipeline>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire already-constructed model services into the request pipeline
    pub fn new(
        settings: Settings,
        tts: Arc<dyn TextToSpeech>,
        translator: Arc<dyn Translator>,
        cache: Arc<AudioCache>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(&settings.server.rate_limit));
        let translate_options = TranslateOptions {
            max_new_tokens: settings.translation.max_new_tokens,
            num_beams: settings.translation.num_beams,
        };

        let speech = SpeechPipeline::new(
            settings.server.allowed_origin.clone(),
            settings.speech.max_chars,
            translate_options,
            rate_limiter.clone(),
            tts,
            translator,
            cache,
        );

        Self {
            settings: Arc::new(settings),
            speech: Arc::new(speech),
            rate_limiter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Connect both models and open the cache.
///
/// Any failure here means the service must not start.
pub async fn build_state(settings: Settings) -> Result<AppState, ServerError> {
    let timeout = Duration::from_secs(settings.models.timeout_seconds);

    let acoustic = HttpAcousticModel::connect(HttpTtsConfig {
        url: settings.models.tts_endpoint.clone(),
        checkpoint: settings.models.tts_checkpoint.clone(),
        config: settings.models.tts_config.clone(),
        device: settings.models.tts_device.clone(),
        timeout,
    })
    .await
    .map_err(|e| ServerError::ModelLoad(e.to_string()))?;

    let normalizer = TextNormalizer::new(settings.speech.fold_rare_characters);
    let tts = Synthesizer::new(
        Box::new(acoustic),
        normalizer,
        settings.speech.add_sentence_end,
    );

    let translator = create_translator(HttpTranslatorConfig {
        endpoint: settings.translation.endpoint.clone(),
        model_id: settings.translation.model_id.clone(),
        device: settings.translation.device.as_deref().and_then(Device::parse),
        timeout,
    });

    if settings.translation.preload {
        translator
            .warm_up()
            .await
            .map_err(|e| ServerError::ModelLoad(e.to_string()))?;
    } else {
        tracing::info!("Translation model will load on first English request");
    }

    let cache = AudioCache::open(
        &settings.cache.dir,
        settings.cache.key_length,
        settings.speech.headroom,
    )
    .map_err(|e| ServerError::Cache(e.to_string()))?;

    tracing::info!(
        tts = %tts.model_name(),
        sample_rate = tts.sample_rate(),
        translator = %translator.name(),
        translator_loaded = translator.is_loaded(),
        cache_dir = %cache.dir().display(),
        "Model services ready"
    );

    Ok(AppState::new(
        settings,
        Arc::new(tts),
        Arc::new(translator),
        Arc::new(cache),
    ))
}
