use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RecognitionConfig;
use crate::error::{CoverscanError, Result};

use super::preprocessing::PreparedImage;
use super::prompts::{COVER_PROMPT, MAX_REPLY_TOKENS};

/// Client for a locally hosted Ollama-compatible runtime. One instance per
/// model; `llama` and `moondream` share the runtime but not the model name.
#[derive(Clone, Debug)]
pub struct OllamaVisionClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaVisionClient {
    pub fn new(config: &RecognitionConfig, model: &str) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(CoverscanError::ProviderUnavailable(
                "No local model configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                CoverscanError::Internal(format!("Failed to create HTTP client for Ollama: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.local.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub async fn describe(&self, image: &PreparedImage) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: COVER_PROMPT,
            images: vec![STANDARD.encode(&image.bytes)],
            stream: false,
            options: GenerateOptions {
                num_predict: MAX_REPLY_TOKENS,
                temperature: 0.0,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    CoverscanError::ProviderUnavailable(format!(
                        "Local runtime not reachable at {}: {e}",
                        self.base_url
                    ))
                } else {
                    CoverscanError::ProviderTransport(format!("Local runtime request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CoverscanError::ProviderUnavailable(format!(
                "Model '{}' is not installed in the local runtime",
                self.model
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoverscanError::ProviderTransport(format!(
                "Local runtime returned {status}: {body}"
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            CoverscanError::ProviderTransport(format!("Failed to decode local runtime response: {e}"))
        })?;

        tracing::debug!(
            model = %self.model,
            reply_len = generated.response.len(),
            "Local runtime reply received"
        );

        Ok(generated.response)
    }
}
