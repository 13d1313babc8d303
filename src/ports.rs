use async_trait::async_trait;
use image::RgbImage;

use crate::{
    domain::entities::{artifact::ArtifactKind, face::DetectedFace},
    helper::error_chain_fmt,
};

/// Error of a model capability call (detector, OCR engine, language model,
/// background remover)
#[derive(thiserror::Error)]
pub enum CapabilityError {
    #[error("Could not encode the capability request: {0}")]
    RequestEncoding(String),
    #[error("Could not reach the capability endpoint: {0}")]
    Connection(String),
    #[error("The capability endpoint answered with status {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("Could not parse the capability response: {0}")]
    ResponseParsing(String),
}

impl std::fmt::Debug for CapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ArtifactStoreError {
    #[error("The artifact could not be found in the object storage: {0}")]
    NotFound(String),
    #[error("Object storage error: {0}")]
    Other(String),
}

impl std::fmt::Debug for ArtifactStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Face detection capability.
///
/// The detector runs as a separate inference service, initialized once and safely
/// reentrant; the pipeline only consumes it through this port.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, CapabilityError>;
}

/// OCR capability: all recognized text blocks concatenated with line breaks,
/// in the order the engine returns them.
#[async_trait]
pub trait TextReader: Send + Sync {
    async fn read(&self, image: &RgbImage) -> Result<String, CapabilityError>;
}

/// Background removal capability: turns an encoded image into a foreground-only
/// image with transparency (PNG bytes).
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove(&self, image_bytes: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}

/// Language model capability, driven with deterministic decoding and a bounded
/// output length.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Object storage port: artifacts are addressed by (category, job key).
///
/// No versioning: a later put with the same key silently replaces the prior object.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(
        &self,
        kind: ArtifactKind,
        job_key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ArtifactStoreError>;

    async fn get(&self, kind: ArtifactKind, job_key: &str) -> Result<Vec<u8>, ArtifactStoreError>;
}
