use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use tracing::{info, warn};

use crate::{
    domain::services::{geometry, imaging},
    ports::FaceDetector,
};

/// Side of the center sampling square, as a fraction of the search region size
const CENTER_SAMPLE_RATIO: f32 = 0.05;

/// Pixels whose gray-scale distance to the sampled paper color stays at or
/// below this value belong to the paper mask
const COLOR_DISTANCE_THRESHOLD: f64 = 20.0;

/// Penalty applied per pixel of horizontal offset between a contour and the
/// region center when scoring candidate contours
const CENTER_OFFSET_WEIGHT: f64 = 10.0;

/// Gray level above which a pixel counts as near-white for the deskew mask
const DESKEW_WHITE_THRESHOLD: f64 = 200.0;

/// Segments the document/paper region held in frame, using color similarity
/// around the region center and contour geometry.
///
/// The paper is assumed to be held below the face, so the search region starts
/// just below the detected face's bounding box; without a face the whole image
/// is searched. Like the headshot stage, every failure normalizes to a miss.
pub struct PaperExtractor {
    detector: Arc<dyn FaceDetector>,
    deskew_enabled: bool,
}

impl PaperExtractor {
    pub fn new(detector: Arc<dyn FaceDetector>, deskew_enabled: bool) -> Self {
        Self {
            detector,
            deskew_enabled,
        }
    }

    /// # Returns
    /// The cropped paper region, or `None` when no paper could be segmented.
    #[tracing::instrument(name = "Extracting paper region", skip(self, image_bytes))]
    pub async fn extract(&self, image_bytes: &[u8]) -> Option<RgbImage> {
        let image = match image::load_from_memory(image_bytes) {
            Ok(image) => image.to_rgb8(),
            Err(error) => {
                warn!(?error, "Could not decode input image");
                return None;
            }
        };
        let (width, height) = image.dimensions();

        let faces = match self.detector.detect(&image).await {
            Ok(faces) => faces,
            Err(error) => {
                warn!(?error, "Face detection failed, searching the whole image");
                vec![]
            }
        };

        // Strip from just below the face to the bottom of the image
        let region = match faces.first() {
            Some(face) => {
                let crop_top = (face.bbox.y2 as i32).max(0);
                if crop_top >= height as i32 {
                    info!("No image strip left below the detected face");
                    return None;
                }
                imaging::crop(&image, 0, crop_top as u32, width, height - crop_top as u32)
            }
            None => image,
        };

        let average = center_average_color(&region);
        let mask = color_similarity_mask(&region, average);

        let contours: Vec<Contour<i32>> = find_contours(&mask);
        let external: Vec<&Contour<i32>> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .collect();

        let region_center_x = (region.width() / 2) as i32;
        let best = external.iter().fold(None, |best: Option<&&Contour<i32>>, contour| {
            match best {
                Some(current)
                    if contour_score(contour, region_center_x)
                        > contour_score(current, region_center_x) =>
                {
                    Some(contour)
                }
                None => Some(contour),
                _ => best,
            }
        });

        let Some(best) = best else {
            info!("No contour found in the paper color mask");
            return None;
        };

        let hull = geometry::convex_hull(&best.points);
        let (x, y, rect_width, rect_height) = geometry::bounding_rect(&hull)?;

        info!(x, y, rect_width, rect_height, "Cropping paper region");
        let crop = imaging::crop(
            &region,
            x as u32,
            y as u32,
            rect_width as u32,
            rect_height as u32,
        );

        if self.deskew_enabled {
            Some(deskew_upright(crop))
        } else {
            Some(crop)
        }
    }
}

/// Average color of a small square at the center of the search region,
/// estimating the paper's color
fn center_average_color(region: &RgbImage) -> [f64; 3] {
    let (width, height) = region.dimensions();

    let slice_width = ((width as f32 * CENTER_SAMPLE_RATIO) as u32).max(1);
    let slice_height = ((height as f32 * CENTER_SAMPLE_RATIO) as u32).max(1);
    let x0 = width / 2 - slice_width / 2;
    let y0 = height / 2 - slice_height / 2;

    let mut sums = [0.0f64; 3];
    for y in y0..y0 + slice_height {
        for x in x0..x0 + slice_width {
            let pixel = region.get_pixel(x, y);
            sums[0] += pixel[0] as f64;
            sums[1] += pixel[1] as f64;
            sums[2] += pixel[2] as f64;
        }
    }

    let count = (slice_width * slice_height) as f64;
    [sums[0] / count, sums[1] / count, sums[2] / count]
}

/// Binary mask of the pixels whose gray-scale absolute difference to the
/// sampled average stays within the threshold
fn color_similarity_mask(region: &RgbImage, average: [f64; 3]) -> GrayImage {
    GrayImage::from_fn(region.width(), region.height(), |x, y| {
        let pixel = region.get_pixel(x, y);
        // Per-channel absolute difference, collapsed to gray with the usual luma weights
        let difference = 0.299 * (pixel[0] as f64 - average[0]).abs()
            + 0.587 * (pixel[1] as f64 - average[1]).abs()
            + 0.114 * (pixel[2] as f64 - average[2]).abs();

        if difference > COLOR_DISTANCE_THRESHOLD {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Large contours near the horizontal center beat merely large ones
fn contour_score(contour: &Contour<i32>, region_center_x: i32) -> f64 {
    let area = geometry::polygon_area(&contour.points);
    // bounding_rect is only None on empty point sets, which find_contours never yields
    let Some((x, _, width, _)) = geometry::bounding_rect(&contour.points) else {
        return f64::NEG_INFINITY;
    };

    let center_distance = ((x + width / 2) - region_center_x).abs() as f64;
    area - CENTER_OFFSET_WEIGHT * center_distance
}

/// Rotates the crop about its own center so the paper sits roughly upright,
/// without resizing the canvas.
///
/// The minimum-area-rectangle angle is ambiguous modulo 90 degrees; it is
/// normalized into (-45, 45] before rotating, so the correction never exceeds
/// an eighth of a turn in either direction.
fn deskew_upright(crop: RgbImage) -> RgbImage {
    let near_white = GrayImage::from_fn(crop.width(), crop.height(), |x, y| {
        if luma(crop.get_pixel(x, y)) > DESKEW_WHITE_THRESHOLD {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let contours: Vec<Contour<i32>> = find_contours(&near_white);
    let largest = contours.iter().fold(None, |best: Option<&Contour<i32>>, contour| match best {
        Some(current)
            if geometry::polygon_area(&contour.points)
                > geometry::polygon_area(&current.points) =>
        {
            Some(contour)
        }
        None => Some(contour),
        _ => best,
    });

    let Some(largest) = largest else {
        return crop;
    };
    let Some(angle) = geometry::min_area_rect_angle(&largest.points) else {
        return crop;
    };

    let angle = normalize_deskew_angle(angle);
    info!(angle, "Deskewing paper crop");

    rotate_about_center(
        &crop,
        -(angle as f32).to_radians(),
        Interpolation::Bicubic,
        Rgb([0, 0, 0]),
    )
}

/// Brings a minimum-area-rectangle angle into (-45, 45] by adding or
/// subtracting a quarter turn outside that range
pub(crate) fn normalize_deskew_angle(angle: f64) -> f64 {
    if angle < -45.0 {
        angle + 90.0
    } else if angle > 45.0 {
        angle - 90.0
    } else {
        angle
    }
}

fn luma(pixel: &Rgb<u8>) -> f64 {
    0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::{
        domain::entities::face::{BoundingBox, DetectedFace},
        ports::CapabilityError,
    };

    struct FixedDetector {
        faces: Vec<DetectedFace>,
    }

    impl FixedDetector {
        fn none() -> Self {
            Self { faces: vec![] }
        }

        fn with_face_bottom(y2: f32) -> Self {
            Self {
                faces: vec![DetectedFace {
                    bbox: BoundingBox {
                        x1: 70.0,
                        y1: 10.0,
                        x2: 130.0,
                        y2,
                    },
                    left_eye: (85.0, 25.0),
                    right_eye: (115.0, 25.0),
                    score: 0.98,
                }],
            }
        }
    }

    #[async_trait]
    impl FaceDetector for FixedDetector {
        async fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, CapabilityError> {
            Ok(self.faces.clone())
        }
    }

    fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, width: u32, height: u32, color: Rgb<u8>) {
        for y in y0..y0 + height {
            for x in x0..x0 + width {
                image.put_pixel(x, y, color);
            }
        }
    }

    /// Lossless encoding keeps the synthetic scenes' hard edges intact
    fn to_png(image: &RgbImage) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[tokio::test]
    async fn a_centered_light_rectangle_is_cropped_to_its_bounds() {
        let mut image = RgbImage::from_pixel(200, 200, BLACK);
        fill_rect(&mut image, 60, 80, 80, 80, WHITE);

        let extractor = PaperExtractor::new(Arc::new(FixedDetector::none()), false);
        let crop = extractor.extract(&to_png(&image)).await.unwrap();

        assert_eq!(crop.dimensions(), (80, 80));
        assert_eq!(crop.get_pixel(40, 40), &WHITE);
    }

    #[tokio::test]
    async fn the_search_region_starts_below_the_detected_face() {
        let mut image = RgbImage::from_pixel(200, 200, BLACK);
        // Paper at image rows 90..180, which is rows 40..130 of the strip below the face
        fill_rect(&mut image, 60, 90, 80, 90, WHITE);

        let extractor =
            PaperExtractor::new(Arc::new(FixedDetector::with_face_bottom(50.0)), false);
        let crop = extractor.extract(&to_png(&image)).await.unwrap();

        assert_eq!(crop.dimensions(), (80, 90));
    }

    #[tokio::test]
    async fn a_face_reaching_the_bottom_leaves_no_region_to_search() {
        let image = RgbImage::from_pixel(200, 200, BLACK);

        let extractor =
            PaperExtractor::new(Arc::new(FixedDetector::with_face_bottom(200.0)), false);

        assert!(extractor.extract(&to_png(&image)).await.is_none());
    }

    #[tokio::test]
    async fn an_empty_color_mask_is_a_detection_miss() {
        // The center sample straddles a hard red/blue split: its average matches
        // neither half, so no pixel lands in the mask.
        let mut image = RgbImage::from_pixel(200, 200, Rgb([255, 0, 0]));
        fill_rect(&mut image, 100, 0, 100, 200, Rgb([0, 0, 255]));

        let extractor = PaperExtractor::new(Arc::new(FixedDetector::none()), false);

        assert!(extractor.extract(&to_png(&image)).await.is_none());
    }

    #[tokio::test]
    async fn centered_contours_beat_larger_off_center_ones() {
        let mut image = RgbImage::from_pixel(300, 100, BLACK);
        // Larger rectangle far from the horizontal center
        fill_rect(&mut image, 0, 10, 100, 20, WHITE);
        // Smaller rectangle right at the center
        fill_rect(&mut image, 130, 40, 40, 40, WHITE);

        let extractor = PaperExtractor::new(Arc::new(FixedDetector::none()), false);
        let crop = extractor.extract(&to_png(&image)).await.unwrap();

        assert_eq!(crop.dimensions(), (40, 40));
    }

    #[tokio::test]
    async fn undecodable_input_is_a_detection_miss() {
        let extractor = PaperExtractor::new(Arc::new(FixedDetector::none()), false);
        assert!(extractor.extract(b"not an image").await.is_none());
    }

    #[tokio::test]
    async fn deskew_keeps_an_already_upright_crop_intact() {
        let mut image = RgbImage::from_pixel(200, 200, BLACK);
        fill_rect(&mut image, 60, 80, 80, 80, WHITE);

        let extractor = PaperExtractor::new(Arc::new(FixedDetector::none()), true);
        let crop = extractor.extract(&to_png(&image)).await.unwrap();

        // Axis-aligned paper: the normalized angle is 0, the canvas is untouched
        assert_eq!(crop.dimensions(), (80, 80));
    }

    #[test]
    fn deskew_angle_normalization_stays_within_the_half_quadrant() {
        assert_eq!(normalize_deskew_angle(-60.0), 30.0);
        assert_eq!(normalize_deskew_angle(50.0), -40.0);
        assert_eq!(normalize_deskew_angle(30.0), 30.0);
        assert_eq!(normalize_deskew_angle(45.0), 45.0);
        assert_eq!(normalize_deskew_angle(-45.0), -45.0);
        assert_eq!(normalize_deskew_angle(90.0), 0.0);
    }
}
