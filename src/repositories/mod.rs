pub mod artifact_s3_repository;
