use std::sync::Arc;

use tracing::{info, warn};

use crate::composition::{Composition, CompositionTrack};
use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::media::{MediaAsset, TrackKind};
use crate::overlay::{OverlayLayerBuilder, RenderTree, TextOverlayRequest};
use crate::time::{scale_duration, Rational, TimeRange, DEFAULT_TIMESCALE};

/// Speed factors offered by the editor
pub const SPEED_PRESETS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 2.5];

/// Convert a user-facing speed such as `1.5` into an exact factor
pub fn speed_factor(value: f64) -> Result<Rational> {
    let factor = Rational::from_seconds(value, DEFAULT_TIMESCALE);
    if !value.is_finite() || !factor.is_positive() {
        return Err(EditorError::invalid_range(format!(
            "speed factor must be greater than zero, got {}",
            value
        )));
    }
    Ok(factor)
}

/// A composition plus the overlay to burn in while exporting it
#[derive(Debug, Clone)]
pub struct OverlayComposition {
    pub composition: Composition,
    pub render_tree: RenderTree,
}

/// Builds export-ready compositions for the editor's operations.
///
/// Every algorithm validates its inputs up front, so a failure never leaves a
/// half-built composition behind.
#[derive(Debug, Clone, Default)]
pub struct CompositionBuilder {
    overlay: OverlayLayerBuilder,
}

impl CompositionBuilder {
    pub fn new(overlay: OverlayLayerBuilder) -> Self {
        Self { overlay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OverlayLayerBuilder::new(&config.overlay, config.export.overlay_frame_rate))
    }

    /// Keep exactly `[start, end)` of the source, re-based to start at zero.
    ///
    /// Video is required; audio follows when the source has it.
    pub fn trim(&self, asset: &Arc<MediaAsset>, start: Rational, end: Rational) -> Result<Composition> {
        let video = asset.video_track()?;
        let range = checked_range(asset, start, end)?;

        if range == asset.full_range() {
            info!("✂️  Trim covers all of {}, keeping it whole", asset.path().display());
        } else {
            info!("✂️  Trimming {} to {}", asset.path().display(), range);
        }

        let mut composition = Composition::new();
        composition
            .add_track(TrackKind::Video)
            .insert_time_range(asset, video.index, range, Rational::ZERO)?;

        if let Some(audio) = asset.first_track(TrackKind::Audio) {
            let track = composition.add_track(TrackKind::Audio);
            let id = track.id;
            if let Err(e) = track.insert_time_range(asset, audio.index, range, Rational::ZERO) {
                warn!("Dropping audio from trim: {}", e);
                composition.remove_track(id);
            }
        }

        composition.set_preferred_transform(video.preferred_transform);
        Ok(composition)
    }

    /// Play `[start, end)` at `factor` speed and the rest unchanged.
    ///
    /// Each track gets up to three back-to-back segments: the part before the
    /// range, the re-timed range, and the part after. Empty before/after parts
    /// are skipped. Output duration is
    /// `start + (end - start) / factor + (duration - end)`.
    pub fn speed_in_range(
        &self,
        asset: &Arc<MediaAsset>,
        start: Rational,
        end: Rational,
        factor: Rational,
    ) -> Result<Composition> {
        let video = asset.video_track()?;
        let range = checked_range(asset, start, end)?;
        let scaled = scale_duration(range.duration(), factor)?;

        info!(
            "⏩ Speed {}x over {} of {} ({}s -> {}s)",
            factor,
            range,
            asset.path().display(),
            range.duration().as_seconds_f64(),
            scaled.as_seconds_f64()
        );

        let mut composition = Composition::new();
        retime_track(composition.add_track(TrackKind::Video), asset, video.index, range, scaled)?;

        match asset.audio_track() {
            Ok(audio) => {
                let track = composition.add_track(TrackKind::Audio);
                let id = track.id;
                if let Err(e) = retime_track(track, asset, audio.index, range, scaled) {
                    warn!("Dropping audio from speed edit: {}", e);
                    composition.remove_track(id);
                }
            }
            Err(e) => info!("   {}, output will be silent", e),
        }

        composition.set_preferred_transform(video.preferred_transform);
        Ok(composition)
    }

    /// Copy the full video track and build the overlay to composite over it.
    ///
    /// The composition itself carries no overlay; the render tree travels
    /// beside it to the exporter.
    pub fn text_overlay(
        &self,
        asset: &Arc<MediaAsset>,
        request: &TextOverlayRequest,
    ) -> Result<OverlayComposition> {
        let video = asset.video_track()?;
        if request.end > asset.duration() {
            return Err(EditorError::invalid_range(format!(
                "overlay ends at {} but the video is only {} long",
                request.end,
                asset.duration()
            )));
        }

        let mut composition = Composition::new();
        let track = composition.add_track(TrackKind::Video);
        track.insert_time_range(asset, video.index, asset.full_range(), Rational::ZERO)?;
        track.preferred_transform = video.preferred_transform;

        let render_tree = self.overlay.build(video.render_size(), request)?;
        info!(
            "🔤 Overlay \"{}\" on {} from {} to {}",
            request.text,
            asset.path().display(),
            request.start,
            request.end
        );

        Ok(OverlayComposition { composition, render_tree })
    }
}

/// `[start, end)` as a range, checked against the asset's bounds
fn checked_range(asset: &MediaAsset, start: Rational, end: Rational) -> Result<TimeRange> {
    if start.is_negative() || end <= start || end > asset.duration() {
        return Err(EditorError::invalid_range(format!(
            "range {}..{} is not within 0..{} with end after start",
            start,
            end,
            asset.duration()
        )));
    }
    TimeRange::from_start_end(start, end)
}

fn retime_track(
    track: &mut CompositionTrack,
    asset: &Arc<MediaAsset>,
    source_track: u32,
    range: TimeRange,
    scaled: Rational,
) -> Result<()> {
    let mut cursor = Rational::ZERO;

    if range.start().is_positive() {
        let before = TimeRange::from_start_end(Rational::ZERO, range.start())?;
        track.insert_time_range(asset, source_track, before, cursor)?;
        cursor += before.duration();
    }

    track.insert_time_range(asset, source_track, range, cursor)?;
    track.scale_time_range(TimeRange::new(cursor, range.duration())?, scaled)?;
    cursor += scaled;

    if range.end() < asset.duration() {
        let after = TimeRange::from_start_end(range.end(), asset.duration())?;
        track.insert_time_range(asset, source_track, after, cursor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AffineTransform, Rect, Size};
    use crate::media::MediaTrack;
    use crate::overlay::{OverlayStyle, OverlayTransform};

    fn secs(s: i64) -> Rational {
        Rational::from_integer(s)
    }

    fn clip(duration: i64, with_audio: bool) -> Arc<MediaAsset> {
        let mut tracks = vec![MediaTrack::video(0, Size::new(1920.0, 1080.0))];
        if with_audio {
            tracks.push(MediaTrack::audio(1));
        }
        Arc::new(MediaAsset::new("clip.mp4", secs(duration), tracks))
    }

    #[test]
    fn test_trim_rebases_to_zero() {
        let builder = CompositionBuilder::default();
        let composition = builder.trim(&clip(10, true), secs(2), secs(5)).unwrap();

        assert_eq!(composition.duration(), secs(3));
        assert!(composition.has_track(TrackKind::Video));
        assert!(composition.has_track(TrackKind::Audio));
        for track in composition.tracks() {
            let segment = &track.segments()[0];
            assert_eq!(segment.target.start(), Rational::ZERO);
            assert_eq!(segment.source_range.start(), secs(2));
        }
    }

    #[test]
    fn test_trim_full_range_keeps_duration() {
        let asset = clip(10, true);
        let composition = CompositionBuilder::default()
            .trim(&asset, Rational::ZERO, asset.duration())
            .unwrap();
        assert_eq!(composition.duration(), asset.duration());
        assert_eq!(composition.tracks()[0].segments().len(), 1);
    }

    #[test]
    fn test_trim_rejects_bad_ranges() {
        let builder = CompositionBuilder::default();
        let asset = clip(10, false);
        for (start, end) in [(5, 5), (6, 2), (2, 11), (-1, 3)] {
            assert!(
                matches!(builder.trim(&asset, secs(start), secs(end)), Err(EditorError::InvalidRange { .. })),
                "{}..{} accepted",
                start,
                end
            );
        }
    }

    #[test]
    fn test_trim_requires_video() {
        let audio_only = Arc::new(MediaAsset::new("song.m4a", secs(10), vec![MediaTrack::audio(0)]));
        assert!(matches!(
            CompositionBuilder::default().trim(&audio_only, secs(1), secs(2)),
            Err(EditorError::NoVideoTrack { .. })
        ));
    }

    #[test]
    fn test_trim_copies_orientation_to_every_track() {
        let rotated = AffineTransform::rotation(std::f64::consts::FRAC_PI_2);
        let asset = Arc::new(MediaAsset::new(
            "portrait.mov",
            secs(4),
            vec![
                MediaTrack::video(0, Size::new(1920.0, 1080.0)).with_transform(rotated),
                MediaTrack::audio(1),
            ],
        ));
        let composition = CompositionBuilder::default().trim(&asset, secs(1), secs(3)).unwrap();
        assert!(composition.tracks().iter().all(|t| t.preferred_transform == rotated));
    }

    #[test]
    fn test_speed_in_range_duration() {
        let builder = CompositionBuilder::default();
        let composition = builder
            .speed_in_range(&clip(10, true), secs(2), secs(4), secs(2))
            .unwrap();

        assert_eq!(composition.duration(), secs(9));
        for track in composition.tracks() {
            let targets: Vec<_> = track.segments().iter().map(|s| s.target).collect();
            assert_eq!(
                targets,
                vec![
                    TimeRange::from_start_end(secs(0), secs(2)).unwrap(),
                    TimeRange::from_start_end(secs(2), secs(3)).unwrap(),
                    TimeRange::from_start_end(secs(3), secs(9)).unwrap(),
                ]
            );
        }
    }

    #[test]
    fn test_speed_duration_formula_is_exact() {
        let builder = CompositionBuilder::default();
        let asset = Arc::new(MediaAsset::new(
            "clip.mp4",
            Rational::new(7013, 600),
            vec![MediaTrack::video(0, Size::new(640.0, 480.0))],
        ));
        for (start, end) in [(Rational::new(1, 3), Rational::new(37, 7)), (Rational::new(11, 10), Rational::new(7013, 600))] {
            for factor in [Rational::new(1, 2), Rational::new(3, 2), Rational::new(5, 2), Rational::new(7, 3)] {
                let composition = builder.speed_in_range(&asset, start, end, factor).unwrap();
                let expected = start + (end - start) / factor + (asset.duration() - end);
                assert_eq!(composition.duration(), expected);
            }
        }
    }

    #[test]
    fn test_speed_skips_empty_before_and_after() {
        let builder = CompositionBuilder::default();
        let asset = clip(10, false);

        let whole = builder.speed_in_range(&asset, secs(0), secs(10), secs(2)).unwrap();
        assert_eq!(whole.tracks()[0].segments().len(), 1);
        assert_eq!(whole.duration(), secs(5));

        let head = builder.speed_in_range(&asset, secs(0), secs(4), secs(2)).unwrap();
        assert_eq!(head.tracks()[0].segments().len(), 2);

        let tail = builder.speed_in_range(&asset, secs(6), secs(10), Rational::new(1, 2)).unwrap();
        assert_eq!(tail.tracks()[0].segments().len(), 2);
        assert_eq!(tail.duration(), secs(14));
    }

    #[test]
    fn test_speed_without_audio_is_video_only() {
        let composition = CompositionBuilder::default()
            .speed_in_range(&clip(10, false), secs(2), secs(4), secs(2))
            .unwrap();
        assert_eq!(composition.tracks().len(), 1);
        assert!(!composition.has_track(TrackKind::Audio));
    }

    #[test]
    fn test_speed_rejects_non_positive_factor() {
        let builder = CompositionBuilder::default();
        assert!(builder.speed_in_range(&clip(10, true), secs(2), secs(4), Rational::ZERO).is_err());
        assert!(builder.speed_in_range(&clip(10, true), secs(2), secs(4), secs(-1)).is_err());
    }

    #[test]
    fn test_speed_presets_convert_exactly() {
        let factors: Vec<Rational> = SPEED_PRESETS.iter().map(|&v| speed_factor(v).unwrap()).collect();
        assert_eq!(factors[0], Rational::new(1, 2));
        assert_eq!(factors[2], Rational::new(3, 2));
        assert_eq!(factors[4], Rational::new(5, 2));
        assert!(speed_factor(0.0).is_err());
        assert!(speed_factor(f64::NAN).is_err());
    }

    #[test]
    fn test_text_overlay_keeps_composition_plain() {
        let asset = clip(10, true);
        let request = TextOverlayRequest {
            text: "Title".to_string(),
            style: OverlayStyle::default(),
            frame: Rect::new(0.0, 0.0, 200.0, 50.0),
            container_size: Some(Size::new(480.0, 270.0)),
            transform: OverlayTransform::IDENTITY,
            start: secs(0),
            end: secs(3),
        };
        let result = CompositionBuilder::default().text_overlay(&asset, &request).unwrap();

        assert_eq!(result.composition.duration(), secs(10));
        assert_eq!(result.composition.tracks().len(), 1);
        assert_eq!(result.render_tree.size, Size::new(1920.0, 1080.0));
        assert_eq!(result.render_tree.text_layer.opacity.begin, Rational::new(1, 10));

        let late = TextOverlayRequest { end: secs(11), ..request };
        assert!(matches!(
            CompositionBuilder::default().text_overlay(&asset, &late),
            Err(EditorError::InvalidRange { .. })
        ));
    }
}
