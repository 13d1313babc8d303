use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use tracing::info;

use crate::{
    adapters::{check_status, map_request_error},
    configuration::CapabilityEndpointSettings,
    domain::entities::face::{BoundingBox, DetectedFace},
    domain::services::imaging,
    ports::{CapabilityError, FaceDetector},
};

/// Face detection served over HTTP by a dedicated inference service.
///
/// The detection model is loaded once by that service; this adapter only ships
/// the encoded image and maps the reported faces back to the domain.
pub struct HttpFaceDetector {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFaceDetector {
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
struct DetectResponse {
    faces: Vec<FaceDto>,
}

/// One face as reported by the detection service: bounding box corners and the
/// two eye landmark points, all in pixel coordinates
#[derive(Deserialize)]
struct FaceDto {
    bbox: [f32; 4],
    left_eye: [f32; 2],
    right_eye: [f32; 2],
    #[serde(default)]
    score: f32,
}

impl From<FaceDto> for DetectedFace {
    fn from(dto: FaceDto) -> Self {
        DetectedFace {
            bbox: BoundingBox {
                x1: dto.bbox[0],
                y1: dto.bbox[1],
                x2: dto.bbox[2],
                y2: dto.bbox[3],
            },
            left_eye: (dto.left_eye[0], dto.left_eye[1]),
            right_eye: (dto.right_eye[0], dto.right_eye[1]),
            score: dto.score,
        }
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    #[tracing::instrument(name = "Detecting faces", skip(self, image))]
    async fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, CapabilityError> {
        let body = imaging::encode_jpeg(image)
            .map_err(|e| CapabilityError::RequestEncoding(e.to_string()))?;

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ResponseParsing(e.to_string()))?;

        info!(nb_faces = parsed.faces.len(), "Face detection completed");
        Ok(parsed.faces.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_detection_response_maps_to_domain_faces() {
        let payload = r#"{
            "faces": [
                {
                    "bbox": [10.0, 20.0, 110.0, 140.0],
                    "left_eye": [40.0, 60.0],
                    "right_eye": [80.0, 62.0],
                    "score": 0.97
                }
            ]
        }"#;

        let parsed: DetectResponse = serde_json::from_str(payload).unwrap();
        let faces: Vec<DetectedFace> = parsed.faces.into_iter().map(Into::into).collect();

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox.x1, 10.0);
        assert_eq!(faces[0].bbox.y2, 140.0);
        assert_eq!(faces[0].left_eye, (40.0, 60.0));
        assert_eq!(faces[0].score, 0.97);
    }

    #[test]
    fn a_missing_score_defaults_to_zero() {
        let payload = r#"{
            "faces": [
                {"bbox": [0.0, 0.0, 1.0, 1.0], "left_eye": [0.0, 0.0], "right_eye": [1.0, 0.0]}
            ]
        }"#;

        let parsed: DetectResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.faces[0].score, 0.0);
    }
}
