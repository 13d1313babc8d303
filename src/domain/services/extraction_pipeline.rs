use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use crate::{
    domain::entities::{
        artifact::ArtifactKind, extraction_job::ExtractionJob,
        extraction_report::ExtractionReport, timing_log::TimingLog,
    },
    domain::services::{
        field_normalization::{FieldNormalizationError, FieldNormalizer},
        headshot_extraction::HeadshotExtractor,
        imaging,
        paper_extraction::PaperExtractor,
    },
    helper::error_chain_fmt,
    ports::{
        ArtifactStore, ArtifactStoreError, BackgroundRemover, CapabilityError, FaceDetector,
        LlmClient, TextReader,
    },
};

#[derive(thiserror::Error)]
pub enum ExtractionPipelineError {
    #[error("No raw image found in the object storage for job key {0}")]
    JobKeyNotFound(String),
    #[error("Object storage failure: {0}")]
    StorageError(#[from] ArtifactStoreError),
    #[error("Text reading failed: {0}")]
    TextReadingError(CapabilityError),
    #[error(transparent)]
    NormalizationError(#[from] FieldNormalizationError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ExtractionPipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Deskew of the extracted paper crop (see `PaperExtractor`)
    pub paper_deskew: bool,
    /// Directory receiving the transient files of each run
    pub scratch_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            paper_deskew: false,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Sequences the extraction stages for one raw image: download, headshot
/// extraction, optional background removal, paper extraction, OCR and field
/// normalization, uploading each produced artifact right after its stage.
///
/// A detection miss never aborts the run: dependent stages are skipped, the
/// independent ones still execute. Every other failure aborts the whole run
/// with a single surfaced error. On all paths the run's transient local files
/// are deleted before returning.
pub struct ExtractionPipeline {
    storage: Arc<dyn ArtifactStore>,
    headshot_extractor: HeadshotExtractor,
    background_remover: Option<Arc<dyn BackgroundRemover>>,
    paper_extractor: PaperExtractor,
    text_reader: Arc<dyn TextReader>,
    field_normalizer: FieldNormalizer,
    options: PipelineOptions,
}

impl ExtractionPipeline {
    pub fn new(
        storage: Arc<dyn ArtifactStore>,
        face_detector: Arc<dyn FaceDetector>,
        background_remover: Option<Arc<dyn BackgroundRemover>>,
        text_reader: Arc<dyn TextReader>,
        llm_client: Arc<dyn LlmClient>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            storage,
            headshot_extractor: HeadshotExtractor::new(face_detector.clone()),
            background_remover,
            paper_extractor: PaperExtractor::new(face_detector, options.paper_deskew),
            text_reader,
            field_normalizer: FieldNormalizer::new(llm_client),
            options,
        }
    }

    /// Runs the whole pipeline for the raw image named by `job_key`.
    ///
    /// # Returns
    /// The aggregated report, or the single failure that aborted the run.
    /// Either way, every transient local file of this run is gone when this
    /// function returns.
    #[tracing::instrument(name = "Running extraction pipeline", skip(self))]
    pub async fn run(&self, job_key: &str) -> Result<ExtractionReport, ExtractionPipelineError> {
        let job = ExtractionJob::new(&self.options.scratch_dir, job_key);

        let outcome = self.execute(&job).await;

        // Reclaims the transient files on success and failure alike
        job.cleanup();

        if let Err(error) = &outcome {
            error!(?error, job_key, "Extraction run failed");
        }
        outcome
    }

    async fn execute(
        &self,
        job: &ExtractionJob,
    ) -> Result<ExtractionReport, ExtractionPipelineError> {
        let mut timer = TimingLog::new();
        let job_key = job.job_key();

        // Download the raw image into this run's transient namespace
        let raw_bytes = self
            .storage
            .get(ArtifactKind::Raw, job_key)
            .await
            .map_err(|error| match error {
                ArtifactStoreError::NotFound(_) => {
                    ExtractionPipelineError::JobKeyNotFound(job_key.to_string())
                }
                other => ExtractionPipelineError::StorageError(other),
            })?;
        std::fs::write(job.input_path(), &raw_bytes)
            .context("Failed to write the raw image to its transient path")?;
        timer.mark("download");

        // Headshot
        let headshot = self.headshot_extractor.extract(&raw_bytes).await;
        timer.mark("headshot_inference");

        let mut headshot_bytes = None;
        if let Some(image) = &headshot {
            let bytes =
                imaging::encode_jpeg(image).context("Failed to encode the headshot as JPEG")?;
            std::fs::write(job.headshot_path(), &bytes)
                .context("Failed to write the headshot to its transient path")?;
            self.storage
                .put(ArtifactKind::Headshot, job_key, &bytes, "image/jpeg")
                .await?;
            timer.mark("upload_headshot");
            headshot_bytes = Some(bytes);
        }

        // Background removal: only when configured, and only over a produced headshot
        let mut headshot_rembg_result = self.background_remover.as_ref().map(|_| false);
        if let (Some(remover), Some(bytes)) = (&self.background_remover, &headshot_bytes) {
            // A removal fault degrades to "not produced", it does not abort the run
            let removed = match remover.remove(bytes).await {
                Ok(removed) => Some(removed),
                Err(error) => {
                    error!(?error, "Background removal failed");
                    None
                }
            };
            timer.mark("rembg_inference");

            if let Some(removed) = removed {
                std::fs::write(job.headshot_no_bg_path(), &removed).context(
                    "Failed to write the background-removed headshot to its transient path",
                )?;
                self.storage
                    .put(ArtifactKind::HeadshotNoBg, job_key, &removed, "image/png")
                    .await?;
                timer.mark("upload_headshot_rembg");
                headshot_rembg_result = Some(true);
            }
        }

        // Paper region: independent of the headshot outcome, it only needs the raw image
        let paper = self.paper_extractor.extract(&raw_bytes).await;
        timer.mark("paper_inference");

        if let Some(image) = &paper {
            let bytes =
                imaging::encode_jpeg(image).context("Failed to encode the paper crop as JPEG")?;
            std::fs::write(job.paper_path(), &bytes)
                .context("Failed to write the paper crop to its transient path")?;
            self.storage
                .put(ArtifactKind::Paper, job_key, &bytes, "image/jpeg")
                .await?;
            timer.mark("upload_paper");
        }

        // OCR and normalization only make sense over an extracted paper
        let mut extract_ocr_result = None;
        let mut parse_ocr_result = None;
        if let Some(image) = &paper {
            let text = self
                .text_reader
                .read(image)
                .await
                .map_err(ExtractionPipelineError::TextReadingError)?;
            timer.mark("extract_ocr_inference");

            let normalized = self.field_normalizer.normalize(&text.to_lowercase()).await?;
            timer.mark("parse_ocr_inference");

            extract_ocr_result = Some(text);
            parse_ocr_result = Some(normalized);
        }

        info!(
            job_key,
            headshot = headshot.is_some(),
            paper = paper.is_some(),
            "Extraction run completed"
        );

        Ok(ExtractionReport {
            status: "ok".to_string(),
            filename: job_key.to_string(),
            headshot_result: headshot.is_some(),
            headshot_rembg_result,
            paper_result: paper.is_some(),
            extract_ocr_result,
            parse_ocr_result,
            timing: timer.into_steps(),
        })
    }
}
