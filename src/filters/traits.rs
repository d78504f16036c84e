use image::RgbImage;

use crate::filters::FilterName;

/// Core trait that every built-in effect implements
pub trait ImageFilter: Send + Sync {
    /// The vocabulary entry this filter implements
    fn name(&self) -> FilterName;

    /// Returns a human-readable description of this filter
    fn description(&self) -> &str;

    /// How many pixels beyond its own position one output pixel reads.
    ///
    /// The video pipeline pads frames by this much (edge-clamped) before
    /// filtering and crops afterwards. Point filters keep the default of 0.
    fn support_radius(&self) -> u32 {
        0
    }

    /// Apply the effect to the full extent of `image`.
    ///
    /// The result has exactly the input's dimensions. Out-of-bounds reads
    /// clamp to the nearest edge pixel.
    fn apply(&self, image: &RgbImage) -> RgbImage;
}
