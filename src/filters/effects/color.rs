//! Point colour effects: each output pixel depends only on its input pixel
//! (and, for the spotlight, its position).

use image::RgbImage;

use super::{generate, luma, map_colors, mix, to_unit, from_unit};
use crate::filters::{FilterName, ImageFilter};

const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Default monochrome tint, a warm brown
pub const MONOCHROME_COLOR: [f32; 3] = [0.6, 0.45, 0.3];
pub const POSTERIZE_LEVELS: u32 = 6;

fn saturate(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let y = luma(rgb);
    mix([y, y, y], rgb, amount)
}

fn contrast(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    [
        (rgb[0] - 0.5) * amount + 0.5,
        (rgb[1] - 0.5) * amount + 0.5,
        (rgb[2] - 0.5) * amount + 0.5,
    ]
}

/// Lift blacks and compress highlights into `[floor, ceiling]`
fn lift(rgb: [f32; 3], floor: f32, ceiling: f32) -> [f32; 3] {
    let span = ceiling - floor;
    [floor + rgb[0] * span, floor + rgb[1] * span, floor + rgb[2] * span]
}

fn tint(rgb: [f32; 3], gain: [f32; 3], offset: [f32; 3]) -> [f32; 3] {
    [
        rgb[0] * gain[0] + offset[0],
        rgb[1] * gain[1] + offset[1],
        rgb[2] * gain[2] + offset[2],
    ]
}

/// Smooth S-curve on a single channel
fn s_curve(v: f32, strength: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    let smooth = v * v * (3.0 - 2.0 * v);
    v + (smooth - v) * strength
}

/// The seven canned photo looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoEffect {
    Chrome,
    Fade,
    Instant,
    Noir,
    Process,
    Tonal,
    Transfer,
}

impl PhotoEffect {
    fn grade(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self {
            PhotoEffect::Chrome => contrast(saturate(rgb, 1.3), 1.12),
            PhotoEffect::Fade => lift(saturate(rgb, 0.6), 0.12, 0.92),
            PhotoEffect::Instant => {
                let warm = tint(saturate(rgb, 0.85), [1.04, 1.0, 0.88], [0.03, 0.02, 0.0]);
                lift(warm, 0.05, 0.97)
            }
            PhotoEffect::Noir => {
                let y = s_curve(luma(rgb), 0.8);
                [y, y, y]
            }
            PhotoEffect::Process => {
                let cool = tint(rgb, [0.92, 1.0, 1.06], [0.0, 0.01, 0.04]);
                contrast(cool, 1.06)
            }
            PhotoEffect::Tonal => {
                let y = luma(rgb);
                [y, y, y]
            }
            PhotoEffect::Transfer => {
                let warm = tint(saturate(rgb, 1.1), [1.07, 1.02, 0.84], [0.02, 0.02, 0.0]);
                lift(warm, 0.04, 1.0)
            }
        }
    }
}

impl ImageFilter for PhotoEffect {
    fn name(&self) -> FilterName {
        match self {
            PhotoEffect::Chrome => FilterName::PhotoEffectChrome,
            PhotoEffect::Fade => FilterName::PhotoEffectFade,
            PhotoEffect::Instant => FilterName::PhotoEffectInstant,
            PhotoEffect::Noir => FilterName::PhotoEffectNoir,
            PhotoEffect::Process => FilterName::PhotoEffectProcess,
            PhotoEffect::Tonal => FilterName::PhotoEffectTonal,
            PhotoEffect::Transfer => FilterName::PhotoEffectTransfer,
        }
    }

    fn description(&self) -> &str {
        match self {
            PhotoEffect::Chrome => "Vivid colours with added contrast",
            PhotoEffect::Fade => "Washed-out colours with lifted blacks",
            PhotoEffect::Instant => "Warm, slightly faded instant-camera look",
            PhotoEffect::Noir => "High-contrast black and white",
            PhotoEffect::Process => "Cool cross-processed tint",
            PhotoEffect::Tonal => "Flat black and white",
            PhotoEffect::Transfer => "Warm vintage transfer look",
        }
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let effect = *self;
        map_colors(image, move |rgb| effect.grade(rgb))
    }
}

pub struct SepiaTone {
    pub intensity: f32,
}

impl SepiaTone {
    pub fn new() -> Self {
        Self { intensity: 1.0 }
    }
}

impl Default for SepiaTone {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for SepiaTone {
    fn name(&self) -> FilterName {
        FilterName::SepiaTone
    }

    fn description(&self) -> &str {
        "Brown-toned antique photograph"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let intensity = self.intensity;
        map_colors(image, move |rgb| {
            let mut sepia = [0.0f32; 3];
            for (out, row) in sepia.iter_mut().zip(SEPIA_MATRIX.iter()) {
                *out = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            }
            mix(rgb, sepia, intensity)
        })
    }
}

/// Clamp each channel into `[min, max]`; the defaults leave images untouched
pub struct ColorClamp {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl ColorClamp {
    pub fn new() -> Self {
        Self { min: [0.0; 3], max: [1.0; 3] }
    }
}

impl Default for ColorClamp {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for ColorClamp {
    fn name(&self) -> FilterName {
        FilterName::ColorClamp
    }

    fn description(&self) -> &str {
        "Clamp colour channels to a range"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (min, max) = (self.min, self.max);
        map_colors(image, move |rgb| {
            [
                rgb[0].clamp(min[0], max[0]),
                rgb[1].clamp(min[1], max[1]),
                rgb[2].clamp(min[2], max[2]),
            ]
        })
    }
}

pub struct ColorInvert;

impl ImageFilter for ColorInvert {
    fn name(&self) -> FilterName {
        FilterName::ColorInvert
    }

    fn description(&self) -> &str {
        "Negative image"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let mut out = image.clone();
        image::imageops::invert(&mut out);
        out
    }
}

/// Remap luminance onto a single tint colour
pub struct ColorMonochrome {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl ColorMonochrome {
    pub fn new() -> Self {
        Self { color: MONOCHROME_COLOR, intensity: 1.0 }
    }
}

impl Default for ColorMonochrome {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for ColorMonochrome {
    fn name(&self) -> FilterName {
        FilterName::ColorMonochrome
    }

    fn description(&self) -> &str {
        "Single-hue image tinted with a fixed colour"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let color = self.color;
        let intensity = self.intensity;
        let tint_luma = luma(color).max(f32::EPSILON);
        map_colors(image, move |rgb| {
            let y = luma(rgb) / tint_luma;
            let toned = [color[0] * y, color[1] * y, color[2] * y];
            mix(rgb, toned, intensity)
        })
    }
}

/// Brighten a soft circular pool of light and darken everything else
pub struct SpotLight {
    /// Light centre, as a fraction of width and height
    pub center: (f32, f32),
    /// Radius of the bright pool, as a fraction of the shorter side
    pub radius: f32,
    pub brightness: f32,
}

impl SpotLight {
    pub fn new() -> Self {
        Self { center: (0.5, 0.5), radius: 0.45, brightness: 1.25 }
    }
}

impl Default for SpotLight {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for SpotLight {
    fn name(&self) -> FilterName {
        FilterName::SpotLight
    }

    fn description(&self) -> &str {
        "Directional spotlight falling off towards the edges"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let cx = self.center.0 * width as f32;
        let cy = self.center.1 * height as f32;
        let radius = (self.radius * width.min(height) as f32).max(1.0);
        let brightness = self.brightness;

        generate(width, height, |x, y| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let distance = (dx * dx + dy * dy).sqrt() / radius;
            // Full light inside the pool, smooth falloff to 15% over one radius
            let falloff = (distance - 1.0).clamp(0.0, 1.0);
            let gain = brightness * (1.0 - falloff) + 0.15 * falloff;
            let rgb = to_unit(image.get_pixel(x, y).0);
            from_unit([rgb[0] * gain, rgb[1] * gain, rgb[2] * gain])
        })
    }
}

/// Quantize each channel to a fixed number of levels
pub struct ColorPosterize {
    pub levels: u32,
}

impl ColorPosterize {
    pub fn new() -> Self {
        Self { levels: POSTERIZE_LEVELS }
    }
}

impl Default for ColorPosterize {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for ColorPosterize {
    fn name(&self) -> FilterName {
        FilterName::ColorPosterize
    }

    fn description(&self) -> &str {
        "Flat bands of colour"
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let steps = self.levels.max(2) as f32 - 1.0;
        map_colors(image, move |rgb| {
            [
                (rgb[0] * steps).round() / steps,
                (rgb[1] * steps).round() / steps,
                (rgb[2] * steps).round() / steps,
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::effects::test_support::test_pattern;
    use std::collections::HashSet;

    #[test]
    fn test_invert_is_involution() {
        let image = test_pattern(10, 8);
        let twice = ColorInvert.apply(&ColorInvert.apply(&image));
        assert_eq!(twice, image);
        assert_eq!(ColorInvert.apply(&image).get_pixel(0, 0).0[2], 255 - image.get_pixel(0, 0).0[2]);
    }

    #[test]
    fn test_default_clamp_is_identity() {
        let image = test_pattern(10, 8);
        assert_eq!(ColorClamp::new().apply(&image), image);
    }

    #[test]
    fn test_noir_and_tonal_are_grey() {
        let image = test_pattern(12, 12);
        for effect in [PhotoEffect::Noir, PhotoEffect::Tonal] {
            let out = effect.apply(&image);
            assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
        }
    }

    #[test]
    fn test_sepia_white_stays_bright_and_warm() {
        let white = RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        let out = SepiaTone::new().apply(&white);
        let px = out.get_pixel(0, 0).0;
        assert_eq!(px[0], 255);
        assert!(px[2] < px[1] && px[1] <= px[0]);
    }

    #[test]
    fn test_posterize_limits_levels() {
        let image = RgbImage::from_fn(256, 1, |x, _| image::Rgb([x as u8, x as u8, x as u8]));
        let out = ColorPosterize::new().apply(&image);
        let distinct: HashSet<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(distinct.len(), POSTERIZE_LEVELS as usize);
    }

    #[test]
    fn test_spotlight_darkens_corners() {
        let grey = RgbImage::from_pixel(40, 40, image::Rgb([120, 120, 120]));
        let out = SpotLight::new().apply(&grey);
        assert!(out.get_pixel(20, 20)[0] > out.get_pixel(0, 0)[0]);
    }

    #[test]
    fn test_monochrome_tints_towards_brown() {
        let grey = RgbImage::from_pixel(2, 2, image::Rgb([128, 128, 128]));
        let px = ColorMonochrome::new().apply(&grey).get_pixel(0, 0).0;
        assert!(px[0] > px[1] && px[1] > px[2]);
    }
}
