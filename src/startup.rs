use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use s3::{creds::Credentials, Bucket, BucketConfiguration, Region};
use secrecy::ExposeSecret;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    adapters::{
        http_background_remover::HttpBackgroundRemover, http_face_detector::HttpFaceDetector,
        http_text_reader::HttpTextReader, ollama_llm_client::OllamaLlmClient,
    },
    configuration::{ObjectStorageSettings, Settings},
    domain::services::extraction_pipeline::{ExtractionPipeline, PipelineOptions},
    ports::{ArtifactStore, BackgroundRemover, FaceDetector},
    repositories::artifact_s3_repository::ArtifactS3Repository,
    routes::{extract, get_headshot, get_paper, health_check, upload_image},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,

    // S3
    // Used for integration tests
    s3_bucket: Bucket,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error("S3 credentials error: {0}")]
    S3CredentialsError(#[from] s3::creds::error::CredentialsError),
    #[error(transparent)]
    S3Error(#[from] s3::error::S3Error),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Could not build a capability HTTP client: {0}")]
    CapabilityClientError(#[from] reqwest::Error),
}

impl Application {
    /// Builds the application: object storage, capability clients, extraction
    /// pipeline, and the HTTP server wiring them together.
    ///
    /// The capability clients are constructed once here and shared by every run.
    ///
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();

        let s3_bucket = set_up_s3(&settings.object_storage).await?;
        let storage: Arc<dyn ArtifactStore> =
            Arc::new(ArtifactS3Repository::new(s3_bucket.clone()));

        let face_detector: Arc<dyn FaceDetector> =
            Arc::new(HttpFaceDetector::new(&settings.capabilities.face_detection)?);
        let text_reader = Arc::new(HttpTextReader::new(&settings.capabilities.ocr)?);
        let llm_client = Arc::new(OllamaLlmClient::new(&settings.capabilities.language_model)?);

        let background_remover: Option<Arc<dyn BackgroundRemover>> =
            if settings.capabilities.background_removal.enabled {
                Some(Arc::new(HttpBackgroundRemover::new(
                    &settings.capabilities.background_removal,
                )?))
            } else {
                None
            };

        let pipeline = ExtractionPipeline::new(
            storage.clone(),
            face_detector,
            background_remover,
            text_reader,
            llm_client,
            PipelineOptions {
                paper_deskew: settings.pipeline.paper_deskew,
                ..PipelineOptions::default()
            },
        );

        let server = run(listener, nb_workers, pipeline, storage)?;

        Ok(Self {
            server,
            port,
            s3_bucket,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn s3_bucket(&self) -> Bucket {
        self.s3_bucket.clone()
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    pipeline: ExtractionPipeline,
    storage: Arc<dyn ArtifactStore>,
) -> Result<Server, std::io::Error> {
    // Wraps the shared state in `actix_web::Data` (`Arc`) to be able to register
    // it and access it from handlers. Shared among all threads.
    let pipeline = Data::new(pipeline);
    let storage: Data<dyn ArtifactStore> = Data::from(storage);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/upload_image", web::post().to(upload_image))
            .route("/extract", web::post().to(extract))
            .route("/headshot/{filename}", web::get().to(get_headshot))
            .route("/paper/{filename}", web::get().to(get_paper))
            .app_data(pipeline.clone())
            .app_data(storage.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

/// Sets up the S3 object storage
///
/// Each environment will use 1 bucket.
/// This bucket is created if it does not exist yet.
///
/// # Returns
/// An initialized bucket
#[tracing::instrument(name = "Setting up S3 object store")]
pub async fn set_up_s3(settings: &ObjectStorageSettings) -> Result<Bucket, ApplicationBuildError> {
    let region = Region::Custom {
        region: settings.region.to_owned(),
        endpoint: settings.endpoint(),
    };

    let credentials = Credentials::new(
        Some(&settings.username),
        Some(settings.password.expose_secret()),
        None,
        None,
        None,
    )?;

    // Instantiates/gets the bucket if it exists
    let bucket =
        Bucket::new(&settings.bucket_name, region.clone(), credentials.clone())?.with_path_style();

    let config = BucketConfiguration::default();

    // Checks if the bucket exist
    if let Err(error) = bucket.head_object("/").await {
        // Only continues if the error is a bucket not found (404)
        match error {
            s3::error::S3Error::Http(code, _) => {
                if code != 404 {
                    return Err(ApplicationBuildError::S3Error(error));
                }
            }
            _ => return Err(ApplicationBuildError::S3Error(error)),
        }

        info!("Unknown bucket {}, creating it ...", settings.bucket_name);

        Bucket::create_with_path_style(&settings.bucket_name, region, credentials, config).await?;
    }

    info!(
        "Bucket {} has been correctly instantiated",
        settings.bucket_name
    );
    Ok(bucket)
}
