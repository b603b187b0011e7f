//! English → Nepali translation
//!
//! Uses NLLB-200 (`facebook/nllb-200-distilled-600M` by default) served by an
//! inference sidecar. The model is loaded lazily, once per process, and every
//! call is serialized through one lock because the tokenizer keeps the source
//! language as mutable state.

mod http;
mod nllb;

pub use http::{HttpTranslationModel, HttpTranslatorConfig};
pub use nllb::{ModelLoader, NllbTranslator};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nepali_tts_core::{Result, TranslateOptions};

/// Inference device for the translation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Apple Metal
    Mps,
    Cuda,
    Cpu,
}

impl Device {
    /// Accelerators first, CPU last
    pub const PREFERENCE: [Device; 3] = [Device::Mps, Device::Cuda, Device::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mps => "mps",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mps" => Some(Device::Mps),
            "cuda" | "gpu" => Some(Device::Cuda),
            "cpu" => Some(Device::Cpu),
            _ => None,
        }
    }

    /// Pick a device from what the backend reports as available.
    ///
    /// An explicit request wins when available; otherwise the first entry of
    /// [`Device::PREFERENCE`] that is available. CPU is always the fallback.
    pub fn select(requested: Option<Device>, available: &[Device]) -> Device {
        if let Some(device) = requested {
            if available.contains(&device) {
                return device;
            }
            tracing::warn!(
                requested = device.as_str(),
                "Requested translation device not available, auto-selecting"
            );
        }

        Self::PREFERENCE
            .into_iter()
            .find(|d| available.contains(d))
            .unwrap_or(Device::Cpu)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding to a loaded sequence-to-sequence model
///
/// Mirrors the Hugging Face tokenizer contract: the source language is
/// tokenizer state and must be set before each `generate`. Implementations
/// are not expected to be shareable, hence `&mut self` and no `Sync` bound.
#[async_trait]
pub trait TranslationModel: Send + 'static {
    fn model_id(&self) -> &str;

    fn device(&self) -> Device;

    /// Set the tokenizer's source language (FLORES-200 tag)
    fn set_source_language(&mut self, tag: &str);

    /// Generate translations of `text` into `target`; beam outputs in rank order
    async fn generate(
        &mut self,
        text: &str,
        target: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>>;
}

/// Create the NLLB translator backed by the HTTP sidecar.
///
/// Nothing is loaded here; the first `translate` (or `warm_up`) connects.
pub fn create_translator(config: HttpTranslatorConfig) -> NllbTranslator {
    let model_id = config.model_id.clone();
    let loader: ModelLoader = Box::new(move || {
        let config = config.clone();
        Box::pin(async move {
            let model = HttpTranslationModel::connect(config).await?;
            Ok(Box::new(model) as Box<dyn TranslationModel>)
        })
    });

    NllbTranslator::new(model_id, loader)
}
