use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    adapters::{check_status, map_request_error},
    configuration::LanguageModelSettings,
    ports::{CapabilityError, LlmClient},
};

/// Language model client against an Ollama-compatible `/api/generate` endpoint.
///
/// Decoding is deterministic: sampling is disabled through a zero temperature,
/// and the output length is bounded by `num_predict`.
pub struct OllamaLlmClient {
    base_url: String,
    model: String,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl OllamaLlmClient {
    pub fn new(settings: &LanguageModelSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_output_tokens: settings.max_output_tokens,
            client,
        })
    }
}

/// Request body for `/api/generate`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from `/api/generate`
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LlmClient for OllamaLlmClient {
    #[tracing::instrument(name = "Generating model answer", skip(self, prompt))]
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ResponseParsing(e.to_string()))?;

        info!(
            model = %self.model,
            answer_len = parsed.response.len(),
            "Model answer generated"
        );
        Ok(parsed.response)
    }
}
