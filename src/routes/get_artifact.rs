use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;

use crate::{
    domain::entities::artifact::ArtifactKind,
    helper::error_chain_fmt,
    ports::{ArtifactStore, ArtifactStoreError},
};

/// Streams back the headshot derived from a previously extracted image
#[tracing::instrument(name = "Get headshot handler", skip(storage))]
pub async fn get_headshot(
    path: web::Path<String>,
    storage: web::Data<dyn ArtifactStore>,
) -> Result<HttpResponse, GetArtifactError> {
    fetch_artifact(ArtifactKind::Headshot, &path, storage.get_ref()).await
}

/// Streams back the paper crop derived from a previously extracted image
#[tracing::instrument(name = "Get paper handler", skip(storage))]
pub async fn get_paper(
    path: web::Path<String>,
    storage: web::Data<dyn ArtifactStore>,
) -> Result<HttpResponse, GetArtifactError> {
    fetch_artifact(ArtifactKind::Paper, &path, storage.get_ref()).await
}

async fn fetch_artifact(
    kind: ArtifactKind,
    job_key: &str,
    storage: &dyn ArtifactStore,
) -> Result<HttpResponse, GetArtifactError> {
    let bytes = storage.get(kind, job_key).await?;

    Ok(HttpResponse::Ok().content_type("image/jpeg").body(bytes))
}

#[derive(thiserror::Error)]
pub enum GetArtifactError {
    #[error(transparent)]
    StorageError(#[from] ArtifactStoreError),
}

impl std::fmt::Debug for GetArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for GetArtifactError {
    fn status_code(&self) -> StatusCode {
        match self {
            GetArtifactError::StorageError(ArtifactStoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            GetArtifactError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from get_artifact handlers", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
