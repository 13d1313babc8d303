use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Encodes an image as JPEG bytes
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Jpeg)?;
    Ok(cursor.into_inner())
}

/// Copies out a rectangular region of an image
pub fn crop(image: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> RgbImage {
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Rotates an image by `theta` radians about an arbitrary center, growing the
/// output canvas so no corner of the source is clipped.
///
/// The rotated content is re-centered on the new canvas; uncovered areas are black.
pub fn rotate_about_with_expansion(
    image: &RgbImage,
    center: (f32, f32),
    theta: f32,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());

    let new_width = (width as f32 * cos + height as f32 * sin).ceil() as u32;
    let new_height = (width as f32 * sin + height as f32 * cos).ceil() as u32;

    let (cx, cy) = center;
    let rotation =
        Projection::translate(cx, cy) * Projection::rotate(theta) * Projection::translate(-cx, -cy);
    let recenter = Projection::translate(
        new_width as f32 / 2.0 - cx,
        new_height as f32 / 2.0 - cy,
    );

    let mut out = RgbImage::new(new_width, new_height);
    warp_into(
        image,
        &(recenter * rotation),
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_jpeg_produces_a_decodable_image() {
        let image = RgbImage::from_pixel(32, 16, Rgb([120, 30, 200]));

        let bytes = encode_jpeg(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();

        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn crop_returns_the_requested_region() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        image.put_pixel(5, 6, Rgb([255, 255, 255]));

        let cropped = crop(&image, 5, 6, 4, 3);

        assert_eq!(cropped.dimensions(), (4, 3));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn quarter_turn_rotation_swaps_canvas_dimensions() {
        let image = RgbImage::from_pixel(100, 50, Rgb([10, 10, 10]));

        let rotated = rotate_about_with_expansion(
            &image,
            (50.0, 25.0),
            std::f32::consts::FRAC_PI_2,
        );

        // Allow 1 pixel of ceil slack on each dimension
        assert!(rotated.width() >= 50 && rotated.width() <= 51);
        assert!(rotated.height() >= 100 && rotated.height() <= 101);
    }

    #[test]
    fn small_rotation_keeps_the_center_pixel() {
        let mut image = RgbImage::from_pixel(41, 41, Rgb([0, 0, 0]));
        image.put_pixel(20, 20, Rgb([255, 0, 0]));

        let rotated = rotate_about_with_expansion(&image, (20.0, 20.0), 0.1);

        let center = rotated.get_pixel(rotated.width() / 2, rotated.height() / 2);
        // The rotation center maps onto the new canvas center
        assert!(center[0] > 0);
    }
}
