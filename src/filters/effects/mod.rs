//! Built-in effect implementations and the pixel helpers they share.

pub mod blur;
pub mod color;
pub mod detail;

use image::{ImageBuffer, RgbImage};
use rayon::prelude::*;

pub use blur::{BoxBlur, DiscBlur, GaussianBlur, MaskedVariableBlur, MedianFilter, MotionBlur};
pub use color::{
    ColorClamp, ColorInvert, ColorMonochrome, ColorPosterize, PhotoEffect, SepiaTone, SpotLight,
};
pub use detail::{NoiseReduction, SharpenLuminance};

/// Rec. 709 luma weights
const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub(crate) fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA_WEIGHTS[0] + rgb[1] * LUMA_WEIGHTS[1] + rgb[2] * LUMA_WEIGHTS[2]
}

pub(crate) fn to_unit(pixel: [u8; 3]) -> [f32; 3] {
    [
        pixel[0] as f32 / 255.0,
        pixel[1] as f32 / 255.0,
        pixel[2] as f32 / 255.0,
    ]
}

pub(crate) fn from_unit(rgb: [f32; 3]) -> [u8; 3] {
    [
        (rgb[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[2].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// Read a pixel, clamping coordinates to the nearest edge
pub(crate) fn sample_clamped(image: &RgbImage, x: i64, y: i64) -> [u8; 3] {
    let cx = x.clamp(0, image.width() as i64 - 1) as u32;
    let cy = y.clamp(0, image.height() as i64 - 1) as u32;
    image.get_pixel(cx, cy).0
}

/// Build an image row by row in parallel
pub(crate) fn generate<F>(width: u32, height: u32, pixel: F) -> RgbImage
where
    F: Fn(u32, u32) -> [u8; 3] + Sync,
{
    let row_len = width as usize * 3;
    let mut data = vec![0u8; row_len * height as usize];
    if row_len > 0 {
        data.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
            for x in 0..width {
                let rgb = pixel(x, y as u32);
                let offset = x as usize * 3;
                row[offset..offset + 3].copy_from_slice(&rgb);
            }
        });
    }
    // Length is width * height * 3 by construction
    ImageBuffer::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Apply a per-pixel colour function in normalized [0, 1] space
pub(crate) fn map_colors<F>(image: &RgbImage, f: F) -> RgbImage
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    let mut out = image.clone();
    let data: &mut [u8] = &mut out;
    data.par_chunks_mut(3).for_each(|px| {
        let rgb = from_unit(f(to_unit([px[0], px[1], px[2]])));
        px.copy_from_slice(&rgb);
    });
    out
}

/// Linear interpolation between two colours
pub(crate) fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{Rgb, RgbImage};

    /// Horizontal gradient with a bright square, handy for spatial filters
    pub fn test_pattern(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let in_square = x >= width / 4 && x < width / 2 && y >= height / 4 && y < height / 2;
            if in_square {
                Rgb([250, 240, 230])
            } else {
                let v = (x * 255 / width.max(1)) as u8;
                Rgb([v, v / 2, 255 - v])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_clamped_reads_edges() {
        let image = test_support::test_pattern(8, 6);
        assert_eq!(sample_clamped(&image, -5, -5), image.get_pixel(0, 0).0);
        assert_eq!(sample_clamped(&image, 100, 2), image.get_pixel(7, 2).0);
    }

    #[test]
    fn test_generate_matches_closure() {
        let image = generate(5, 3, |x, y| [x as u8, y as u8, 7]);
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(4, 2).0, [4, 2, 7]);
    }

    #[test]
    fn test_unit_conversion_is_stable() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(from_unit(to_unit([v, v, v])), [v, v, v]);
        }
    }
}
