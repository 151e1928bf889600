//! Hosted inference-API provider (Hugging Face style text generation).

use super::provider::{CompletionOptions, LlmError, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Provider backed by a hosted text-generation inference API.
///
/// Speaks the Hugging Face inference protocol: POST to
/// `<base_url>/models/<model>` with `{inputs, parameters}` and a bearer
/// token, response is `[{"generated_text": ...}]`.
pub struct HostedProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HostedProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
}

/// Pull the generated text out of the API's response value.
///
/// The API returns either `[{"generated_text": "..."}]`, a bare string, or
/// `{"error": "..."}`.
fn extract_generated_text(value: Value) -> Result<String, LlmError> {
    if let Some(text) = value
        .get(0)
        .and_then(|entry| entry.get("generated_text"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }

    if let Some(text) = value.as_str() {
        return Ok(text.to_string());
    }

    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(LlmError::InvalidResponse(message.to_string()));
    }

    Err(LlmError::InvalidResponse(format!(
        "unrecognized response shape: {}",
        value
    )))
}

#[async_trait]
impl LlmProvider for HostedProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: options.max_tokens.min(512),
                temperature: options.temperature,
            },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending generation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        extract_generated_text(value)
    }
}
