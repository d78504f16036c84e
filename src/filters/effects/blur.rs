//! Neighbourhood filters. Every sample outside the image clamps to the edge,
//! so borders never darken.

use image::{imageops, RgbImage};

use super::{generate, mix, sample_clamped, to_unit, from_unit};
use crate::filters::{FilterName, ImageFilter};

pub const BOX_BLUR_RADIUS: u32 = 10;
pub const DISC_BLUR_RADIUS: u32 = 8;
pub const GAUSSIAN_BLUR_SIGMA: f32 = 10.0;
pub const MASKED_BLUR_SIGMA: f32 = 5.0;
pub const MOTION_BLUR_RADIUS: u32 = 20;

/// Gaussian support covers three standard deviations
fn gaussian_support(sigma: f32) -> u32 {
    (sigma * 3.0).ceil() as u32
}

fn average(samples: impl Iterator<Item = [u8; 3]>) -> [u8; 3] {
    let mut sum = [0u32; 3];
    let mut count = 0u32;
    for px in samples {
        sum[0] += px[0] as u32;
        sum[1] += px[1] as u32;
        sum[2] += px[2] as u32;
        count += 1;
    }
    let count = count.max(1);
    [
        ((sum[0] + count / 2) / count) as u8,
        ((sum[1] + count / 2) / count) as u8,
        ((sum[2] + count / 2) / count) as u8,
    ]
}

/// One separable box pass along a single axis
fn box_pass(image: &RgbImage, radius: u32, horizontal: bool) -> RgbImage {
    let (width, height) = image.dimensions();
    let r = radius as i64;
    generate(width, height, |x, y| {
        average((-r..=r).map(|d| {
            if horizontal {
                sample_clamped(image, x as i64 + d, y as i64)
            } else {
                sample_clamped(image, x as i64, y as i64 + d)
            }
        }))
    })
}

pub struct BoxBlur {
    pub radius: u32,
}

impl BoxBlur {
    pub fn new() -> Self {
        Self { radius: BOX_BLUR_RADIUS }
    }
}

impl Default for BoxBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for BoxBlur {
    fn name(&self) -> FilterName {
        FilterName::BoxBlur
    }

    fn description(&self) -> &str {
        "Square averaging blur"
    }

    fn support_radius(&self) -> u32 {
        self.radius
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        box_pass(&box_pass(image, self.radius, true), self.radius, false)
    }
}

/// Circular averaging kernel
pub struct DiscBlur {
    pub radius: u32,
}

impl DiscBlur {
    pub fn new() -> Self {
        Self { radius: DISC_BLUR_RADIUS }
    }

    fn kernel(&self) -> Vec<(i64, i64)> {
        let r = self.radius as i64;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    offsets.push((dx, dy));
                }
            }
        }
        offsets
    }
}

impl Default for DiscBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for DiscBlur {
    fn name(&self) -> FilterName {
        FilterName::DiscBlur
    }

    fn description(&self) -> &str {
        "Lens-like circular blur"
    }

    fn support_radius(&self) -> u32 {
        self.radius
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let kernel = self.kernel();
        generate(width, height, |x, y| {
            average(
                kernel
                    .iter()
                    .map(|&(dx, dy)| sample_clamped(image, x as i64 + dx, y as i64 + dy)),
            )
        })
    }
}

pub struct GaussianBlur {
    pub sigma: f32,
}

impl GaussianBlur {
    pub fn new() -> Self {
        Self { sigma: GAUSSIAN_BLUR_SIGMA }
    }
}

impl Default for GaussianBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for GaussianBlur {
    fn name(&self) -> FilterName {
        FilterName::GaussianBlur
    }

    fn description(&self) -> &str {
        "Smooth gaussian blur"
    }

    fn support_radius(&self) -> u32 {
        gaussian_support(self.sigma)
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        imageops::blur(image, self.sigma)
    }
}

/// Blur whose strength follows a vertical mask: sharp at the top,
/// fully blurred at the bottom.
pub struct MaskedVariableBlur {
    pub sigma: f32,
}

impl MaskedVariableBlur {
    pub fn new() -> Self {
        Self { sigma: MASKED_BLUR_SIGMA }
    }

    fn mask(y: u32, height: u32) -> f32 {
        if height <= 1 {
            return 1.0;
        }
        y as f32 / (height - 1) as f32
    }
}

impl Default for MaskedVariableBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for MaskedVariableBlur {
    fn name(&self) -> FilterName {
        FilterName::MaskedVariableBlur
    }

    fn description(&self) -> &str {
        "Blur that increases towards the bottom of the frame"
    }

    fn support_radius(&self) -> u32 {
        gaussian_support(self.sigma)
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let blurred = imageops::blur(image, self.sigma);
        generate(width, height, |x, y| {
            let sharp = to_unit(image.get_pixel(x, y).0);
            let soft = to_unit(blurred.get_pixel(x, y).0);
            from_unit(mix(sharp, soft, Self::mask(y, height)))
        })
    }
}

/// 3x3 per-channel median
pub struct MedianFilter;

impl ImageFilter for MedianFilter {
    fn name(&self) -> FilterName {
        FilterName::MedianFilter
    }

    fn description(&self) -> &str {
        "Removes speckle noise while keeping edges"
    }

    fn support_radius(&self) -> u32 {
        1
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        generate(width, height, |x, y| {
            let mut channels = [[0u8; 9]; 3];
            let mut i = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let px = sample_clamped(image, x as i64 + dx, y as i64 + dy);
                    for c in 0..3 {
                        channels[c][i] = px[c];
                    }
                    i += 1;
                }
            }
            let mut out = [0u8; 3];
            for (c, values) in channels.iter_mut().enumerate() {
                values.sort_unstable();
                out[c] = values[4];
            }
            out
        })
    }
}

/// Linear streak along `angle` (radians, 0 = horizontal)
pub struct MotionBlur {
    pub radius: u32,
    pub angle: f32,
}

impl MotionBlur {
    pub fn new() -> Self {
        Self { radius: MOTION_BLUR_RADIUS, angle: 0.0 }
    }
}

impl Default for MotionBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for MotionBlur {
    fn name(&self) -> FilterName {
        FilterName::MotionBlur
    }

    fn description(&self) -> &str {
        "Directional blur simulating camera movement"
    }

    fn support_radius(&self) -> u32 {
        self.radius
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let r = self.radius as i64;
        let (sin, cos) = self.angle.sin_cos();
        let offsets: Vec<(i64, i64)> = (-r..=r)
            .map(|d| ((d as f32 * cos).round() as i64, (d as f32 * sin).round() as i64))
            .collect();
        generate(width, height, |x, y| {
            average(
                offsets
                    .iter()
                    .map(|&(dx, dy)| sample_clamped(image, x as i64 + dx, y as i64 + dy)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::effects::test_support::test_pattern;
    use image::Rgb;

    fn flat(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([90, 140, 200]))
    }

    #[test]
    fn test_blurs_keep_flat_images_flat() {
        let image = flat(24, 16);
        let filters: Vec<Box<dyn ImageFilter>> = vec![
            Box::new(BoxBlur::new()),
            Box::new(DiscBlur::new()),
            Box::new(MedianFilter),
            Box::new(MotionBlur::new()),
        ];
        for filter in filters {
            assert_eq!(filter.apply(&image), image, "{} changed a flat image", filter.name());
        }
    }

    #[test]
    fn test_box_blur_softens_edges() {
        let image = test_pattern(40, 40);
        let out = BoxBlur::new().apply(&image);
        // Inside the bright square, near its edge, the blur pulls in darker neighbours
        assert!(out.get_pixel(10, 10)[0] < image.get_pixel(10, 10)[0]);
    }

    #[test]
    fn test_median_removes_single_speck() {
        let mut image = flat(5, 5);
        image.put_pixel(2, 2, Rgb([255, 0, 0]));
        let out = MedianFilter.apply(&image);
        assert_eq!(out.get_pixel(2, 2).0, [90, 140, 200]);
    }

    #[test]
    fn test_motion_blur_is_horizontal_by_default() {
        let mut image = RgbImage::from_pixel(41, 41, Rgb([0, 0, 0]));
        image.put_pixel(20, 20, Rgb([255, 255, 255]));
        let out = MotionBlur::new().apply(&image);
        assert!(out.get_pixel(30, 20)[0] > 0);
        assert_eq!(out.get_pixel(20, 30)[0], 0);
    }

    #[test]
    fn test_masked_blur_keeps_top_row_sharp() {
        let image = test_pattern(30, 30);
        let out = MaskedVariableBlur::new().apply(&image);
        for x in 0..30 {
            assert_eq!(out.get_pixel(x, 0), image.get_pixel(x, 0));
        }
    }

    #[test]
    fn test_support_radius_matches_reach() {
        assert_eq!(BoxBlur::new().support_radius(), 10);
        assert_eq!(DiscBlur::new().support_radius(), 8);
        assert_eq!(GaussianBlur::new().support_radius(), 30);
        assert_eq!(MedianFilter.support_radius(), 1);
    }
}
