//! Lazily loaded NLLB translator

use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OnceCell};

use nepali_tts_core::{
    Error, Result, TranslateOptions, TranslationResult, Translator, ENGLISH, NEPALI,
};

use super::TranslationModel;

/// Produces a loaded model. Called at most once per successful load.
pub type ModelLoader =
    Box<dyn Fn() -> BoxFuture<'static, Result<Box<dyn TranslationModel>>> + Send + Sync>;

/// English → Nepali translator holding one shared model instance
///
/// The model is loaded on first use (or by [`NllbTranslator::warm_up`]) and
/// reused for the life of the process. A failed load is not cached, so a
/// later call retries. All generation goes through a single async mutex:
/// the source-language tag and the generate call happen under the same lock.
pub struct NllbTranslator {
    model_id: String,
    loader: ModelLoader,
    model: OnceCell<Mutex<Box<dyn TranslationModel>>>,
}

impl NllbTranslator {
    pub fn new(model_id: impl Into<String>, loader: ModelLoader) -> Self {
        Self {
            model_id: model_id.into(),
            loader,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Load the model now instead of on the first request
    pub async fn warm_up(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&Mutex<Box<dyn TranslationModel>>> {
        self.model
            .get_or_try_init(|| async {
                let start = Instant::now();
                tracing::info!(model = %self.model_id, "Loading translation model");

                let model = (self.loader)().await.map_err(|e| {
                    tracing::error!(model = %self.model_id, error = %e, "Translation model load failed");
                    e
                })?;

                tracing::info!(
                    model = %model.model_id(),
                    device = %model.device(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Translation model ready"
                );
                Ok::<_, Error>(Mutex::new(model))
            })
            .await
    }
}

#[async_trait]
impl Translator for NllbTranslator {
    async fn translate(
        &self,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<TranslationResult> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TranslationResult::empty(&self.model_id));
        }

        let model = self.model().await?;
        let mut model = model.lock().await;

        model.set_source_language(ENGLISH);
        let outputs = model.generate(text, NEPALI, options).await?;

        let translated = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::translation("model returned no output"))?;

        tracing::debug!(
            chars_in = text.chars().count(),
            chars_out = translated.chars().count(),
            "Translated"
        );

        Ok(TranslationResult {
            text: translated.trim().to_string(),
            model_id: model.model_id().to_string(),
            src_lang: ENGLISH.to_string(),
            tgt_lang: NEPALI.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}

impl std::fmt::Debug for NllbTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NllbTranslator")
            .field("model_id", &self.model_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
