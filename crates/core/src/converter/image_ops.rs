//! Pixel-level helpers for converted stickers.

use image::{GenericImageView, RgbaImage};
use std::path::Path;

use super::error::ConverterError;

/// Sampling stride used when scanning for transparency.
const ALPHA_SAMPLE_STEP: usize = 4;

fn open_rgba(path: &Path) -> Result<RgbaImage, ConverterError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| ConverterError::image_failed(format!("{}: {}", path.display(), e)))
}

/// Whether any sampled pixel of the image is not fully opaque.
pub(crate) fn has_transparency(path: &Path) -> Result<bool, ConverterError> {
    let img = open_rgba(path)?;
    let (width, height) = img.dimensions();

    for y in (0..height).step_by(ALPHA_SAMPLE_STEP) {
        for x in (0..width).step_by(ALPHA_SAMPLE_STEP) {
            if img.get_pixel(x, y)[3] < u8::MAX {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Crops fully transparent rows and columns from the image edges, in place.
///
/// Returns `false` when nothing was cropped (already tight, or the image
/// is entirely transparent).
pub(crate) fn trim_transparent_edges(path: &Path) -> Result<bool, ConverterError> {
    let img = open_rgba(path)?;
    let (width, height) = img.dimensions();

    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0;
    let mut max_y = 0;
    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[3] > 0 {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x > max_x || min_y > max_y {
        return Ok(false);
    }
    let crop_w = max_x - min_x + 1;
    let crop_h = max_y - min_y + 1;
    if crop_w == width && crop_h == height {
        return Ok(false);
    }

    let cropped = img.view(min_x, min_y, crop_w, crop_h).to_image();
    cropped
        .save(path)
        .map_err(|e| ConverterError::image_failed(e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn save(path: &Path, width: u32, height: u32, paint: impl Fn(u32, u32) -> Rgba<u8>) {
        RgbaImage::from_fn(width, height, paint).save(path).unwrap();
    }

    #[test]
    fn test_opaque_image_has_no_transparency() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("opaque.png");
        save(&path, 16, 16, |_, _| Rgba([10, 20, 30, 255]));

        assert!(!has_transparency(&path).unwrap());
    }

    #[test]
    fn test_sampled_transparent_pixel_is_detected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("alpha.png");
        save(&path, 16, 16, |x, y| {
            if x == 8 && y == 8 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([1, 1, 1, 255])
            }
        });

        assert!(has_transparency(&path).unwrap());
    }

    #[test]
    fn test_trim_crops_to_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sticker.png");
        save(&path, 20, 10, |x, y| {
            if (5..15).contains(&x) && (2..6).contains(&y) {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });

        assert!(trim_transparent_edges(&path).unwrap());
        let trimmed = image::open(&path).unwrap();
        assert_eq!(trimmed.dimensions(), (10, 4));
    }

    #[test]
    fn test_trim_leaves_tight_and_empty_images() {
        let temp = TempDir::new().unwrap();
        let tight = temp.path().join("tight.png");
        save(&tight, 4, 4, |_, _| Rgba([1, 2, 3, 255]));
        assert!(!trim_transparent_edges(&tight).unwrap());

        let empty = temp.path().join("empty.png");
        save(&empty, 4, 4, |_, _| Rgba([0, 0, 0, 0]));
        assert!(!trim_transparent_edges(&empty).unwrap());
    }

    #[test]
    fn test_unreadable_image() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            has_transparency(&path),
            Err(ConverterError::ImageFailed { .. })
        ));
    }
}
