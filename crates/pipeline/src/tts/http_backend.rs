//! HTTP TTS backend - calls the VITS inference sidecar
//!
//! The sidecar loads the Coqui VITS checkpoint and config once and
//! answers synthesis requests with raw f32 samples.
//!
//! Sidecar protocol:
//! - `GET /health` → `{"ok": true, "sample_rate": 22050}`
//! - `POST /load` `{"checkpoint", "config", "device"}` → `{"ok": true, "sample_rate": 22050}`
//! - `POST /synthesize` `{"text"}` → `{"samples": [..]}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AcousticModel;
use crate::PipelineError;

/// HTTP TTS backend configuration
#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    /// Base URL of the sidecar
    pub url: String,
    /// Path to the model checkpoint
    pub checkpoint: String,
    /// Path to the model config
    pub config: String,
    /// Inference device
    pub device: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5002".to_string(),
            checkpoint: "models/best_model.pth".to_string(),
            config: "models/config.json".to_string(),
            device: "cpu".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    checkpoint: &'a str,
    config: &'a str,
    device: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    sample_rate: u32,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(default)]
    samples: Vec<f32>,
    #[serde(default)]
    error: Option<String>,
}

/// Acoustic model served by the sidecar
pub struct HttpAcousticModel {
    config: HttpTtsConfig,
    client: reqwest::Client,
    sample_rate: u32,
}

impl HttpAcousticModel {
    /// Probe the sidecar and load the checkpoint. Fails if the service is
    /// down or the checkpoint cannot be loaded.
    pub async fn connect(config: HttpTtsConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::ModelLoad(format!("Failed to create HTTP client: {}", e)))?;

        let health_url = format!("{}/health", config.url);
        client
            .get(&health_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                PipelineError::ModelLoad(format!(
                    "TTS service not reachable at {}: {}",
                    config.url, e
                ))
            })?;

        let load_url = format!("{}/load", config.url);
        let loaded: LoadResponse = client
            .post(&load_url)
            .json(&LoadRequest {
                checkpoint: &config.checkpoint,
                config: &config.config,
                device: &config.device,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                PipelineError::ModelLoad(format!(
                    "Failed to load {} via {}: {}",
                    config.checkpoint, config.url, e
                ))
            })?
            .json()
            .await
            .map_err(|e| PipelineError::ModelLoad(format!("Invalid load response: {}", e)))?;

        if loaded.sample_rate == 0 {
            return Err(PipelineError::ModelLoad(
                "TTS service reported a zero sample rate".to_string(),
            ));
        }

        tracing::info!(
            url = %config.url,
            checkpoint = %config.checkpoint,
            device = %config.device,
            sample_rate = loaded.sample_rate,
            "HTTP TTS backend connected"
        );

        Ok(Self {
            config,
            client,
            sample_rate: loaded.sample_rate,
        })
    }
}

#[async_trait]
impl AcousticModel for HttpAcousticModel {
    async fn infer(&mut self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let url = format!("{}/synthesize", self.config.url);

        let response = self
            .client
            .post(&url)
            .json(&SynthesizeRequest { text })
            .send()
            .await
            .map_err(|e| PipelineError::Model(format!("HTTP TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Model(format!(
                "HTTP TTS service returned error: {}",
                response.status()
            )));
        }

        let result: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Model(format!("Failed to parse TTS response: {}", e)))?;

        if let Some(error) = result.error {
            return Err(PipelineError::Model(error));
        }

        Ok(result.samples)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "vits-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_response_error_field() {
        let parsed: SynthesizeResponse =
            serde_json::from_str(r#"{"error": "bad input"}"#).unwrap();
        assert!(parsed.samples.is_empty());
        assert_eq!(parsed.error.as_deref(), Some("bad input"));
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let config = HttpTtsConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let err = HttpAcousticModel::connect(config).await.err();
        assert!(matches!(err, Some(PipelineError::ModelLoad(_))));
    }
}
