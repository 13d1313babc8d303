use std::sync::Arc;

use image::RgbImage;
use tracing::{error, info, warn};

use crate::{
    domain::entities::face::{BoundingBox, DetectedFace},
    domain::services::imaging,
    ports::FaceDetector,
};

/// Padding around the face bounding box, as a fraction of its height
const PADDING_RATIO: f32 = 0.30;

/// Eye-to-eye angles at or below this threshold (degrees) are left untouched
const DESKEW_THRESHOLD_DEGREES: f32 = 2.0;

/// Detects the most prominent face of an image and crops it with padding,
/// straightening tilted faces first.
///
/// All failures of this stage (undecodable input, no face, detector fault)
/// normalize to a detection miss; no error escapes.
pub struct HeadshotExtractor {
    detector: Arc<dyn FaceDetector>,
}

impl HeadshotExtractor {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// # Returns
    /// The cropped headshot, or `None` when no face could be extracted.
    #[tracing::instrument(name = "Extracting headshot", skip(self, image_bytes))]
    pub async fn extract(&self, image_bytes: &[u8]) -> Option<RgbImage> {
        let image = match image::load_from_memory(image_bytes) {
            Ok(image) => image.to_rgb8(),
            Err(error) => {
                warn!(?error, "Could not decode input image");
                return None;
            }
        };

        let faces = match self.detector.detect(&image).await {
            Ok(faces) => faces,
            Err(error) => {
                error!(?error, "Face detection failed");
                return None;
            }
        };

        let best = largest_face(&faces)?.clone();

        let angle = best.eye_angle_degrees();
        let (image, face) = if angle.abs() > DESKEW_THRESHOLD_DEGREES {
            self.straighten(image, best, angle).await
        } else {
            (image, best)
        };

        info!(bbox = ?face.bbox, "Cropping headshot");
        crop_with_padding(&image, &face.bbox)
    }

    /// Rotates the whole image about the face's bounding-box center so the eyes
    /// become level, then re-detects on the rotated image.
    ///
    /// Falls back to the pre-rotation geometry when re-detection finds nothing.
    async fn straighten(
        &self,
        image: RgbImage,
        face: DetectedFace,
        angle: f32,
    ) -> (RgbImage, DetectedFace) {
        info!(angle, "Straightening tilted face");

        let rotated =
            imaging::rotate_about_with_expansion(&image, face.bbox.center(), -angle.to_radians());

        match self.detector.detect(&rotated).await {
            Ok(rotated_faces) => match largest_face(&rotated_faces) {
                Some(rotated_face) => {
                    let rotated_face = rotated_face.clone();
                    (rotated, rotated_face)
                }
                None => {
                    warn!("No face re-detected after rotation, keeping original geometry");
                    (image, face)
                }
            },
            Err(error) => {
                error!(?error, "Re-detection after rotation failed, keeping original geometry");
                (image, face)
            }
        }
    }
}

/// The face with the largest bounding-box area; on ties the first one
/// encountered wins
fn largest_face(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    faces.iter().fold(None, |best, face| match best {
        Some(current) if face.bbox.area() > current.bbox.area() => Some(face),
        None => Some(face),
        _ => best,
    })
}

/// Crops the bounding box padded by 30% of its height on all four sides,
/// clamped to the image bounds
fn crop_with_padding(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (width, height) = (image.width() as i32, image.height() as i32);

    let x1 = bbox.x1 as i32;
    let y1 = bbox.y1 as i32;
    let x2 = bbox.x2 as i32;
    let y2 = bbox.y2 as i32;

    let pad = (PADDING_RATIO * (y2 - y1) as f32).round() as i32;

    let x1 = (x1 - pad).max(0);
    let y1 = (y1 - pad).max(0);
    let x2 = (x2 + pad).min(width);
    let y2 = (y2 + pad).min(height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(imaging::crop(
        image,
        x1 as u32,
        y1 as u32,
        (x2 - x1) as u32,
        (y2 - y1) as u32,
    ))
}
