use std::path::{Path, PathBuf};

use crate::error::{EditorError, Result};
use crate::geometry::{AffineTransform, Size};
use crate::time::{Rational, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

/// One decodable stream inside a media container
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTrack {
    /// Stream index within the container
    pub index: u32,
    pub kind: TrackKind,
    /// Coded frame size; zero for audio tracks
    pub natural_size: Size,
    /// Orientation the player must apply for correct display
    pub preferred_transform: AffineTransform,
    pub frame_rate: Option<Rational>,
}

impl MediaTrack {
    pub fn video(index: u32, natural_size: Size) -> Self {
        Self {
            index,
            kind: TrackKind::Video,
            natural_size,
            preferred_transform: AffineTransform::IDENTITY,
            frame_rate: None,
        }
    }

    pub fn audio(index: u32) -> Self {
        Self {
            index,
            kind: TrackKind::Audio,
            natural_size: Size::default(),
            preferred_transform: AffineTransform::IDENTITY,
            frame_rate: None,
        }
    }

    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.preferred_transform = transform;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Natural size with the preferred transform applied, absolute dimensions
    pub fn render_size(&self) -> Size {
        self.natural_size.applying(&self.preferred_transform)
    }
}

/// Read-only handle to a decodable media file.
///
/// Assets are shared (`Arc<MediaAsset>`) between compositions and concurrent
/// readers; nothing in the crate mutates one after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    path: PathBuf,
    duration: Rational,
    tracks: Vec<MediaTrack>,
}

impl MediaAsset {
    pub fn new<P: Into<PathBuf>>(path: P, duration: Rational, tracks: Vec<MediaTrack>) -> Self {
        Self {
            path: path.into(),
            duration,
            tracks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration(&self) -> Rational {
        self.duration
    }

    /// `[0, duration)`
    pub fn full_range(&self) -> TimeRange {
        TimeRange::from_duration(self.duration.max(Rational::ZERO)).unwrap_or(TimeRange::ZERO)
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn first_track(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks_of(kind).next()
    }

    pub fn track(&self, index: u32) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.index == index)
    }

    /// The first video track, which drives orientation and render size
    pub fn video_track(&self) -> Result<&MediaTrack> {
        self.first_track(TrackKind::Video).ok_or_else(|| EditorError::NoVideoTrack {
            path: self.path.display().to_string(),
        })
    }

    pub fn audio_track(&self) -> Result<&MediaTrack> {
        self.first_track(TrackKind::Audio).ok_or_else(|| EditorError::NoAudioTrack {
            path: self.path.display().to_string(),
        })
    }

    pub fn has_audio(&self) -> bool {
        self.first_track(TrackKind::Audio).is_some()
    }

    pub fn render_size(&self) -> Result<Size> {
        Ok(self.video_track()?.render_size())
    }
}
