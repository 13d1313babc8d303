use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::{
    adapters::{check_status, map_request_error},
    configuration::BackgroundRemovalSettings,
    ports::{BackgroundRemover, CapabilityError},
};

/// Background removal served over HTTP by a dedicated inference service.
///
/// Ships the encoded headshot and receives back a PNG with transparency where
/// the background used to be.
pub struct HttpBackgroundRemover {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackgroundRemover {
    pub fn new(settings: &BackgroundRemovalSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl BackgroundRemover for HttpBackgroundRemover {
    #[tracing::instrument(name = "Removing headshot background", skip(self, image_bytes))]
    async fn remove(&self, image_bytes: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let response = self
            .client
            .post(format!("{}/remove", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CapabilityError::ResponseParsing(e.to_string()))?;

        info!(output_len = bytes.len(), "Background removal completed");
        Ok(bytes.to_vec())
    }
}
