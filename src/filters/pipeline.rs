//! Applying named filters to stills and, frame by frame, to whole videos.

use std::sync::Arc;

use image::{imageops, RgbImage};
use tracing::debug;

use crate::error::Result;
use crate::filters::effects::{generate, sample_clamped};
use crate::filters::{FilterName, FilterRegistry, ImageFilter};
use crate::media::MediaAsset;
use crate::video::Frame;

/// Per-frame callback run by the exporter on every composed frame
pub trait FrameProcessor: Send + Sync {
    fn process(&self, frame: Frame) -> Result<Frame>;

    /// Short label for logs
    fn label(&self) -> String;
}

/// Apply a built-in filter, looked up by identifier or alias, to a still
pub fn apply_filter(name: &str, image: &RgbImage) -> Result<RgbImage> {
    apply_filter_with(&FilterRegistry::new(), name, image)
}

pub fn apply_filter_with(registry: &FilterRegistry, name: &str, image: &RgbImage) -> Result<RgbImage> {
    let filter = registry.get_by_name(name)?;
    Ok(filter.apply(image))
}

/// Extend `image` by `margin` pixels on every side, repeating edge pixels
pub fn clamp_to_extent(image: &RgbImage, margin: u32) -> RgbImage {
    if margin == 0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let m = margin as i64;
    generate(width + 2 * margin, height + 2 * margin, |x, y| {
        sample_clamped(image, x as i64 - m, y as i64 - m)
    })
}

/// Cut the original `width` x `height` extent back out of a padded image
pub fn crop_to_extent(image: &RgbImage, margin: u32, width: u32, height: u32) -> RgbImage {
    if margin == 0 && image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::crop_imm(image, margin, margin, width, height).to_image()
}

/// A named filter wrapped for use on every frame of a video.
///
/// Frames are edge-clamped by the filter's support radius before filtering
/// and cropped back afterwards, so blurs don't pull black in at the borders.
#[derive(Clone)]
pub struct VideoFilterPipeline {
    filter: Arc<dyn ImageFilter>,
}

impl VideoFilterPipeline {
    pub fn new(filter: Arc<dyn ImageFilter>) -> Self {
        Self { filter }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(FilterRegistry::new().get_by_name(name)?))
    }

    pub fn filter_name(&self) -> FilterName {
        self.filter.name()
    }

    pub fn process_image(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let margin = self.filter.support_radius();
        let padded = clamp_to_extent(image, margin);
        let filtered = self.filter.apply(&padded);
        crop_to_extent(&filtered, margin, width, height)
    }
}

impl FrameProcessor for VideoFilterPipeline {
    fn process(&self, frame: Frame) -> Result<Frame> {
        Ok(Frame::new(self.process_image(frame.as_image())))
    }

    fn label(&self) -> String {
        self.filter.name().identifier().to_string()
    }
}

/// Asset plus the per-frame filter to burn into it on export
#[derive(Clone)]
pub struct FilteredVideo {
    pub asset: Arc<MediaAsset>,
    pub pipeline: VideoFilterPipeline,
}

/// Wrap a named filter for application to every frame of `asset`.
///
/// Fails immediately on an unknown name or a missing video track; nothing
/// is decoded until the result is exported.
pub fn apply_filter_to_video(name: &str, asset: Arc<MediaAsset>) -> Result<FilteredVideo> {
    let pipeline = VideoFilterPipeline::from_name(name)?;
    asset.video_track()?;
    debug!(
        "Prepared {} for {}",
        pipeline.filter_name(),
        asset.path().display()
    );
    Ok(FilteredVideo { asset, pipeline })
}

/// Filter-preview thumbnail: one frame with the named effect applied
pub fn filter_thumbnail(name: &str, frame: &Frame) -> Result<Frame> {
    apply_filter(name, frame.as_image()).map(Frame::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::filters::effects::test_support::test_pattern;
    use crate::geometry::Size;
    use crate::media::MediaTrack;
    use crate::time::Rational;
    use image::Rgb;

    #[test]
    fn test_unknown_filter_is_rejected() {
        let image = test_pattern(8, 8);
        assert!(matches!(
            apply_filter("NotARealFilter", &image),
            Err(EditorError::UnknownFilter { .. })
        ));
    }

    #[test]
    fn test_every_filter_preserves_dimensions() {
        let image = test_pattern(33, 17);
        for name in FilterName::ALL {
            let out = apply_filter(name.identifier(), &image).unwrap();
            assert_eq!(out.dimensions(), (33, 17), "{}", name);
        }
    }

    #[test]
    fn test_clamp_then_crop_restores_original() {
        let image = test_pattern(10, 6);
        let padded = clamp_to_extent(&image, 4);
        assert_eq!(padded.dimensions(), (18, 14));
        assert_eq!(padded.get_pixel(0, 0), image.get_pixel(0, 0));
        assert_eq!(padded.get_pixel(17, 13), image.get_pixel(9, 5));
        assert_eq!(crop_to_extent(&padded, 4, 10, 6), image);
    }

    #[test]
    fn test_pipeline_does_not_darken_borders() {
        let white = RgbImage::from_pixel(32, 24, Rgb([255, 255, 255]));
        let pipeline = VideoFilterPipeline::from_name("CIGaussianBlur").unwrap();
        let out = pipeline.process(Frame::new(white)).unwrap();
        assert_eq!(out.dimensions(), (32, 24));
        assert_eq!(out.get_pixel(0, 0), [255, 255, 255]);
        assert_eq!(out.get_pixel(31, 23), [255, 255, 255]);
    }

    #[test]
    fn test_video_filter_requires_video_track() {
        let audio_only = Arc::new(MediaAsset::new(
            "voice.m4a",
            Rational::from_integer(5),
            vec![MediaTrack::audio(0)],
        ));
        assert!(matches!(
            apply_filter_to_video("noir", audio_only),
            Err(EditorError::NoVideoTrack { .. })
        ));

        let video = Arc::new(MediaAsset::new(
            "clip.mp4",
            Rational::from_integer(5),
            vec![MediaTrack::video(0, Size::new(64.0, 36.0))],
        ));
        let filtered = apply_filter_to_video("noir", video).unwrap();
        assert_eq!(filtered.pipeline.filter_name(), FilterName::PhotoEffectNoir);
    }
}
