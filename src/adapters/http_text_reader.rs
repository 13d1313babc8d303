use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use tracing::info;

use crate::{
    adapters::{check_status, map_request_error},
    configuration::CapabilityEndpointSettings,
    domain::services::imaging,
    ports::{CapabilityError, TextReader},
};

/// OCR served over HTTP by a dedicated inference service.
///
/// The engine answers with an ordered list of text blocks; they are concatenated
/// with line breaks in the order the engine returned them, no re-ordering.
pub struct HttpTextReader {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTextReader {
    pub fn new(settings: &CapabilityEndpointSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct OcrResponse {
    blocks: Vec<OcrBlock>,
}

#[derive(Deserialize)]
struct OcrBlock {
    content: String,
}

#[async_trait]
impl TextReader for HttpTextReader {
    #[tracing::instrument(name = "Reading text from image", skip(self, image))]
    async fn read(&self, image: &RgbImage) -> Result<String, CapabilityError> {
        let body = imaging::encode_jpeg(image)
            .map_err(|e| CapabilityError::RequestEncoding(e.to_string()))?;

        let response = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ResponseParsing(e.to_string()))?;

        let mut text = String::new();
        for block in parsed.blocks {
            text.push_str(&block.content);
            text.push('\n');
        }

        info!(text_len = text.len(), "OCR completed");
        Ok(text)
    }
}
