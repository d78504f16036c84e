use image::{imageops, RgbImage};

use super::{generate, luma, sample_clamped, to_unit, from_unit};
use crate::filters::{FilterName, ImageFilter};

pub const SHARPEN_AMOUNT: f32 = 0.4;
pub const SHARPEN_SIGMA: f32 = 1.69;
pub const NOISE_LEVEL: f32 = 0.02;
pub const NOISE_SHARPNESS: f32 = 0.4;

/// Unsharp mask applied to luminance only, so colours don't fringe
pub struct SharpenLuminance {
    pub sharpness: f32,
    pub sigma: f32,
}

impl SharpenLuminance {
    pub fn new() -> Self {
        Self { sharpness: SHARPEN_AMOUNT, sigma: SHARPEN_SIGMA }
    }
}

impl Default for SharpenLuminance {
    fn default() -> Self {
        Self::new()
    }
}

/// Add `amount * (luma(original) - luma(blurred))` to every channel
fn sharpen_luma(image: &RgbImage, blurred: &RgbImage, amount: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    generate(width, height, |x, y| {
        let rgb = to_unit(image.get_pixel(x, y).0);
        let detail = luma(rgb) - luma(to_unit(blurred.get_pixel(x, y).0));
        let boost = detail * amount;
        from_unit([rgb[0] + boost, rgb[1] + boost, rgb[2] + boost])
    })
}

impl ImageFilter for SharpenLuminance {
    fn name(&self) -> FilterName {
        FilterName::SharpenLuminance
    }

    fn description(&self) -> &str {
        "Sharpens detail without shifting colour"
    }

    fn support_radius(&self) -> u32 {
        (self.sigma * 3.0).ceil() as u32
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let blurred = imageops::blur(image, self.sigma);
        sharpen_luma(image, &blurred, self.sharpness)
    }
}

/// Edge-preserving smoothing followed by a light luminance sharpen.
///
/// Each pixel averages only those 5x5 neighbours whose luminance lies within
/// the noise threshold, so edges are left alone.
pub struct NoiseReduction {
    pub noise_level: f32,
    pub sharpness: f32,
}

impl NoiseReduction {
    pub fn new() -> Self {
        Self { noise_level: NOISE_LEVEL, sharpness: NOISE_SHARPNESS }
    }

    fn threshold(&self) -> f32 {
        // Noise level is relative; the threshold spans a few of its steps
        (self.noise_level * 4.0).max(1.0 / 255.0)
    }

    fn smooth(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let threshold = self.threshold();
        generate(width, height, |x, y| {
            let center = to_unit(image.get_pixel(x, y).0);
            let center_luma = luma(center);
            let mut sum = [0.0f32; 3];
            let mut count = 0.0f32;
            for dy in -2..=2 {
                for dx in -2..=2 {
                    let px = to_unit(sample_clamped(image, x as i64 + dx, y as i64 + dy));
                    if (luma(px) - center_luma).abs() <= threshold {
                        sum[0] += px[0];
                        sum[1] += px[1];
                        sum[2] += px[2];
                        count += 1.0;
                    }
                }
            }
            from_unit([sum[0] / count, sum[1] / count, sum[2] / count])
        })
    }
}

impl Default for NoiseReduction {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for NoiseReduction {
    fn name(&self) -> FilterName {
        FilterName::NoiseReduction
    }

    fn description(&self) -> &str {
        "Reduces grain while keeping edges crisp"
    }

    fn support_radius(&self) -> u32 {
        // 5x5 window plus a 3x3 blur for the sharpen
        3
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let smoothed = self.smooth(image);
        let softened = imageops::blur(&smoothed, 0.5);
        sharpen_luma(&smoothed, &softened, self.sharpness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_sharpen_increases_edge_contrast() {
        let image = RgbImage::from_fn(20, 4, |x, _| if x < 10 { Rgb([60, 60, 60]) } else { Rgb([180, 180, 180]) });
        let out = SharpenLuminance::new().apply(&image);
        assert!(out.get_pixel(9, 1)[0] < 60);
        assert!(out.get_pixel(10, 1)[0] > 180);
    }

    #[test]
    fn test_noise_reduction_smooths_small_noise_but_keeps_edges() {
        let image = RgbImage::from_fn(20, 20, |x, y| {
            let base = if x < 10 { 40 } else { 200 };
            let jitter = if (x + y) % 2 == 0 { 2 } else { 0 };
            Rgb([base + jitter; 3])
        });
        let out = NoiseReduction::new().apply(&image);

        let left = out.get_pixel(4, 10)[0] as i32;
        let right = out.get_pixel(15, 10)[0] as i32;
        assert!((left - 41).abs() <= 2);
        assert!((right - 201).abs() <= 2);
    }
}
