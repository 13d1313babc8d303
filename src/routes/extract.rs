use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::services::extraction_pipeline::{ExtractionPipeline, ExtractionPipelineError},
    helper::error_chain_fmt,
};

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    filename: String,
}

/// Runs the extraction pipeline over a previously uploaded raw image.
///
/// Detection misses are part of the report, not errors: the handler only fails
/// when the job key is unknown or when a stage faulted.
#[tracing::instrument(name = "Extract handler", skip(pipeline))]
pub async fn extract(
    query: web::Query<ExtractQuery>,
    pipeline: web::Data<ExtractionPipeline>,
) -> Result<HttpResponse, ExtractError> {
    let report = pipeline.run(&query.filename).await?;

    Ok(HttpResponse::Ok().json(report))
}

#[derive(thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    PipelineError(#[from] ExtractionPipelineError),
}

impl std::fmt::Debug for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ExtractError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExtractError::PipelineError(ExtractionPipelineError::JobKeyNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ExtractError::PipelineError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from extract handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
