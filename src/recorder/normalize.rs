//! Frame normalization: RGBA capture buffer in, encoder-ready RGB out.
//!
//! The encoder is opened once with fixed dimensions. Display scaling or a
//! geometry change mid-session can make captures come back at a different
//! size; those frames are resized to the declared region, which silently
//! interpolates their content.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};

use super::types::CaptureRegion;

/// Drops the alpha channel and resizes to `region` when the capture size drifted.
pub fn normalize_frame(raw: &RgbaImage, region: CaptureRegion) -> RgbImage {
    let rgb = strip_alpha(raw);

    if rgb.dimensions() == region.dimensions() {
        return rgb;
    }

    tracing::debug!(target: "recorder",
        "[NORMALIZE] Resizing {:?} -> {:?}", rgb.dimensions(), region.dimensions());

    imageops::resize(&rgb, region.width, region.height, FilterType::Triangle)
}

fn strip_alpha(raw: &RgbaImage) -> RgbImage {
    let (width, height) = raw.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (dst, src) in rgb.pixels_mut().zip(raw.pixels()) {
        let [r, g, b, _] = src.0;
        *dst = Rgb([r, g, b]);
    }

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn region(width: u32, height: u32) -> CaptureRegion {
        CaptureRegion::new(width, height).unwrap()
    }

    #[test]
    fn test_alpha_is_discarded() {
        let raw = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 0]));
        let out = normalize_frame(&raw, region(4, 2));

        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.as_raw().len(), 4 * 2 * 3);
        assert!(out.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn test_channel_order_is_preserved() {
        let mut raw = RgbaImage::new(2, 1);
        raw.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        raw.put_pixel(1, 0, Rgba([0, 0, 255, 128]));

        let out = normalize_frame(&raw, region(2, 1));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_larger_capture_is_downscaled_to_region() {
        let raw = RgbaImage::from_pixel(3840, 2160, Rgba([200, 100, 50, 255]));
        let out = normalize_frame(&raw, region(1920, 1080));

        assert_eq!(out.dimensions(), (1920, 1080));
        let [r, g, b] = out.get_pixel(960, 540).0;
        assert!(r.abs_diff(200) <= 1 && g.abs_diff(100) <= 1 && b.abs_diff(50) <= 1);
    }

    #[test]
    fn test_smaller_capture_is_upscaled_to_region() {
        let raw = RgbaImage::from_pixel(7, 5, Rgba([1, 2, 3, 4]));
        let out = normalize_frame(&raw, region(16, 9));

        assert_eq!(out.dimensions(), (16, 9));
        assert_eq!(out.as_raw().len(), 16 * 9 * 3);
    }

    #[test]
    fn test_aspect_change_still_matches_region() {
        let raw = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let out = normalize_frame(&raw, region(64, 36));
        assert_eq!(out.dimensions(), (64, 36));
    }
}
