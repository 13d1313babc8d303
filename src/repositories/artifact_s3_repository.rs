use async_trait::async_trait;
use s3::Bucket;
use tracing::info;

use crate::{
    domain::entities::artifact::ArtifactKind,
    ports::{ArtifactStore, ArtifactStoreError},
};

/// Simple Storage Service (S3) client storing the raw and derived artifacts
///
/// Artifacts are laid out under fixed category prefixes inside a single bucket.
pub struct ArtifactS3Repository {
    // If one day there is a need to have several buckets for scaling reasons,
    // a vector of Bucket will be necessary + knowing in which bucket each file is
    bucket: Bucket,
}

impl ArtifactS3Repository {
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }
}

#[async_trait]
impl ArtifactStore for ArtifactS3Repository {
    /// Saves an artifact under its category prefix.
    ///
    /// No overwrite protection: a later upload with the same key silently
    /// replaces the prior object.
    #[tracing::instrument(name = "Uploading artifact to bucket", skip(self, bytes))]
    async fn put(
        &self,
        kind: ArtifactKind,
        job_key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ArtifactStoreError> {
        let object_path = kind.object_path(job_key);

        let response = self
            .bucket
            .put_object_with_content_type(&object_path, bytes, content_type)
            .await
            .map_err(|error| ArtifactStoreError::Other(error.to_string()))?;

        info!(
            object_path,
            status_code = response.status_code(),
            "Uploaded artifact"
        );
        Ok(())
    }

    /// Gets an artifact from its category prefix
    #[tracing::instrument(name = "Downloading artifact from bucket", skip(self))]
    async fn get(&self, kind: ArtifactKind, job_key: &str) -> Result<Vec<u8>, ArtifactStoreError> {
        let object_path = kind.object_path(job_key);

        let response = self
            .bucket
            .get_object(&object_path)
            .await
            .map_err(|error| match error {
                s3::error::S3Error::Http(404, _) => ArtifactStoreError::NotFound(object_path.clone()),
                other => ArtifactStoreError::Other(other.to_string()),
            })?;

        info!(
            object_path,
            status_code = response.status_code(),
            "Downloaded artifact"
        );
        Ok(response.to_vec())
    }
}
