use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    domain::entities::artifact::ArtifactKind,
    helper::error_chain_fmt,
    ports::{ArtifactStore, ArtifactStoreError},
};

/// Extensions accepted for an uploaded image
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "file")]
    file: TempFile,
}

/// Receives one image and registers it as a raw artifact.
///
/// The job key is derived from a SHA-256 digest of the full byte stream plus the
/// original extension, making uploads idempotent: the same bytes always land on
/// the same key. The multipart temp file is reclaimed when the form is dropped.
#[tracing::instrument(name = "Uploading raw image", skip(form, storage))]
pub async fn upload_image(
    MultipartForm(form): MultipartForm<UploadForm>,
    storage: web::Data<dyn ArtifactStore>,
) -> Result<HttpResponse, UploadImageError> {
    let file_name = form
        .file
        .file_name
        .as_deref()
        .ok_or(UploadImageError::MissingFileName)?;

    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadImageError::UnsupportedFormat(file_name.to_string()));
    }

    let bytes = std::fs::read(form.file.file.path())
        .context("Failed to read the uploaded temp file")?;

    let hash = content_hash(&bytes);
    let job_key = format!("{}.{}", hash, extension);

    storage
        .put(
            ArtifactKind::Raw,
            &job_key,
            &bytes,
            content_type_for(&extension),
        )
        .await?;

    info!(job_key, size = bytes.len(), "Registered raw image");
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "filename": job_key,
        "hash": hash,
    })))
}

/// Hex digest of a SHA-256 over the full byte stream
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();

    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

#[derive(thiserror::Error)]
pub enum UploadImageError {
    #[error("The uploaded file has no name")]
    MissingFileName,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    StorageError(#[from] ArtifactStoreError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl std::fmt::Debug for UploadImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UploadImageError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadImageError::MissingFileName | UploadImageError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            UploadImageError::StorageError(_) | UploadImageError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    #[tracing::instrument(name = "Response error from upload_image handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_same_bytes_always_hash_to_the_same_key() {
        let first = content_hash(b"image bytes");
        let second = content_hash(b"image bytes");

        assert_eq!(first, second);
        // SHA-256 hex digest
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn different_bytes_hash_to_different_keys() {
        assert_ne!(content_hash(b"image one"), content_hash(b"image two"));
    }

    #[test]
    fn extensions_map_to_their_content_type() {
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("webp"), "image/webp");
    }
}
