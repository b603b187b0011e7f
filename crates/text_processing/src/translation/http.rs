//! HTTP translation backend - calls an NLLB inference sidecar
//!
//! The sidecar owns the Hugging Face tokenizer and seq2seq weights. This
//! side keeps the tokenizer contract explicit: the source language is
//! state on the binding and travels with every generate request.
//!
//! Sidecar protocol:
//! - `GET /health` → `{"ok": true, "devices": ["cuda", "cpu"]}`
//! - `POST /load` `{"model_id", "device"}` → `{"ok": true}`
//! - `POST /generate` `{"text", "src_lang", "tgt_lang", "max_new_tokens", "num_beams"}`
//!   → `{"outputs": ["..."]}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nepali_tts_core::{Error, Result, TranslateOptions, ENGLISH};

use super::{Device, TranslationModel};

/// HTTP translation backend configuration
#[derive(Debug, Clone)]
pub struct HttpTranslatorConfig {
    /// Base URL of the inference sidecar
    pub endpoint: String,
    /// Pretrained model identifier
    pub model_id: String,
    /// Preferred device; auto-selected when `None` or unavailable
    pub device: Option<Device>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpTranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5003".to_string(),
            model_id: "facebook/nllb-200-distilled-600M".to_string(),
            device: None,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    devices: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model_id: &'a str,
    device: Device,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    text: &'a str,
    src_lang: &'a str,
    tgt_lang: &'a str,
    max_new_tokens: usize,
    num_beams: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Translation model served by the sidecar
pub struct HttpTranslationModel {
    config: HttpTranslatorConfig,
    client: reqwest::Client,
    device: Device,
    source_language: String,
}

impl HttpTranslationModel {
    /// Probe the sidecar, pick a device and load the model on it
    pub async fn connect(config: HttpTranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::model_load(format!("Failed to create HTTP client: {}", e)))?;

        let health_url = format!("{}/health", config.endpoint);
        let health: HealthResponse = client
            .get(&health_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::model_load(format!(
                    "Translation service not reachable at {}: {}",
                    config.endpoint, e
                ))
            })?
            .json()
            .await
            .map_err(|e| Error::model_load(format!("Invalid health response: {}", e)))?;

        let available: Vec<Device> = health
            .devices
            .iter()
            .filter_map(|d| Device::parse(d))
            .collect();
        let device = Device::select(config.device, &available);

        let load_url = format!("{}/load", config.endpoint);
        client
            .post(&load_url)
            .json(&LoadRequest {
                model_id: &config.model_id,
                device,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::model_load(format!("Failed to load {}: {}", config.model_id, e))
            })?;

        tracing::info!(
            endpoint = %config.endpoint,
            model = %config.model_id,
            device = %device,
            "HTTP translation backend connected"
        );

        Ok(Self {
            config,
            client,
            device,
            source_language: ENGLISH.to_string(),
        })
    }
}

#[async_trait]
impl TranslationModel for HttpTranslationModel {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn device(&self) -> Device {
        self.device
    }

    fn set_source_language(&mut self, tag: &str) {
        self.source_language = tag.to_string();
    }

    async fn generate(
        &mut self,
        text: &str,
        target: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>> {
        let url = format!("{}/generate", self.config.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                text,
                src_lang: &self.source_language,
                tgt_lang: target,
                max_new_tokens: options.max_new_tokens,
                num_beams: options.num_beams,
            })
            .send()
            .await
            .map_err(|e| Error::translation(format!("Translation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::translation(format!(
                "Translation service returned error: {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::translation(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = result.error {
            return Err(Error::translation(error));
        }

        Ok(result.outputs)
    }
}
