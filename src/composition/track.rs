use std::sync::Arc;

use tracing::debug;

use crate::error::{EditorError, Result};
use crate::geometry::{AffineTransform, Size};
use crate::media::{MediaAsset, TrackKind};
use crate::time::{Rational, TimeRange};

/// A copied sub-range of one source track, placed on a composition track.
///
/// `target` is where the segment plays on the output timeline. When its
/// duration differs from the source range's the segment is re-timed.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: Arc<MediaAsset>,
    /// Stream index of the source track inside `source`
    pub source_track: u32,
    pub source_range: TimeRange,
    pub target: TimeRange,
}

impl Segment {
    /// Playback speed: source time consumed per unit of output time
    pub fn speed(&self) -> Rational {
        self.source_range
            .duration()
            .checked_div(self.target.duration())
            .unwrap_or(Rational::ONE)
    }

    pub fn is_retimed(&self) -> bool {
        self.source_range.duration() != self.target.duration()
    }

    /// Split at output time `at`, strictly inside the target range.
    ///
    /// Source times map linearly, so both halves keep the original speed.
    fn split_at(&self, at: Rational) -> (Segment, Segment) {
        let head_target = self.target.duration().min(at - self.target.start());
        let head_source = self.source_range.duration() * head_target / self.target.duration();

        let head = Segment {
            source: Arc::clone(&self.source),
            source_track: self.source_track,
            source_range: TimeRange::from_start_end(
                self.source_range.start(),
                self.source_range.start() + head_source,
            )
            .unwrap_or(self.source_range),
            target: TimeRange::from_start_end(self.target.start(), at).unwrap_or(self.target),
        };
        let tail = Segment {
            source: Arc::clone(&self.source),
            source_track: self.source_track,
            source_range: TimeRange::from_start_end(
                self.source_range.start() + head_source,
                self.source_range.end(),
            )
            .unwrap_or(self.source_range),
            target: TimeRange::from_start_end(at, self.target.end()).unwrap_or(self.target),
        };
        (head, tail)
    }
}

/// Either a segment or an empty stretch of the output timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackItem<'a> {
    Segment(&'a Segment),
    /// Renders as black (video) or silence (audio)
    Gap(TimeRange),
}

/// One output track of a [`Composition`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionTrack {
    pub id: u32,
    pub kind: TrackKind,
    /// Display orientation, copied from the dominant source video track
    pub preferred_transform: AffineTransform,
    segments: Vec<Segment>,
}

impl CompositionTrack {
    fn new(id: u32, kind: TrackKind) -> Self {
        Self {
            id,
            kind,
            preferred_transform: AffineTransform::IDENTITY,
            segments: Vec::new(),
        }
    }

    /// Segments in timeline order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last segment
    pub fn duration(&self) -> Rational {
        self.segments
            .iter()
            .map(|s| s.target.end())
            .max()
            .unwrap_or(Rational::ZERO)
    }

    /// The full timeline from zero, with empty stretches reported as gaps
    pub fn timeline(&self) -> Vec<TrackItem<'_>> {
        let mut items = Vec::with_capacity(self.segments.len());
        let mut cursor = Rational::ZERO;
        for segment in &self.segments {
            if segment.target.start() > cursor {
                if let Ok(gap) = TimeRange::from_start_end(cursor, segment.target.start()) {
                    items.push(TrackItem::Gap(gap));
                }
            }
            items.push(TrackItem::Segment(segment));
            cursor = segment.target.end();
        }
        items
    }

    /// Copy `source_range` of a source track onto this track at `at`.
    ///
    /// Content already at or after `at` moves later by the inserted duration,
    /// and a segment straddling `at` is split. An empty range inserts nothing.
    pub fn insert_time_range(
        &mut self,
        source: &Arc<MediaAsset>,
        source_track: u32,
        source_range: TimeRange,
        at: Rational,
    ) -> Result<()> {
        let track = source.track(source_track).ok_or_else(|| {
            EditorError::invalid_range(format!(
                "{} has no track {}",
                source.path().display(),
                source_track
            ))
        })?;
        if track.kind != self.kind {
            return Err(EditorError::invalid_range(format!(
                "cannot insert {} track {} into {} track {}",
                track.kind.as_str(),
                source_track,
                self.kind.as_str(),
                self.id
            )));
        }
        if source_range.start().is_negative() || source_range.end() > source.duration() {
            return Err(EditorError::invalid_range(format!(
                "source range {} exceeds asset duration {}",
                source_range,
                source.duration()
            )));
        }
        if at.is_negative() {
            return Err(EditorError::invalid_range(format!("insertion time {} is negative", at)));
        }
        if source_range.is_empty() {
            return Ok(());
        }

        self.split_at(at);
        let shift = source_range.duration();
        for segment in self.segments.iter_mut() {
            if segment.target.start() >= at {
                segment.target = segment.target.shifted(shift);
            }
        }

        debug!(
            "Track {} ({}): inserted {} at {}",
            self.id,
            self.kind.as_str(),
            source_range,
            at
        );
        self.segments.push(Segment {
            source: Arc::clone(source),
            source_track,
            source_range,
            target: source_range.shifted(at - source_range.start()),
        });
        self.sort();
        Ok(())
    }

    /// Re-time the content of `range` so it plays over `new_duration`.
    ///
    /// Segments crossing the range boundaries are split first; content after
    /// the range moves by the change in duration.
    pub fn scale_time_range(&mut self, range: TimeRange, new_duration: Rational) -> Result<()> {
        if range.is_empty() {
            return Err(EditorError::invalid_range("cannot scale an empty range"));
        }
        if !new_duration.is_positive() {
            return Err(EditorError::invalid_range(format!(
                "scaled duration must be positive, got {}",
                new_duration
            )));
        }

        self.split_at(range.start());
        self.split_at(range.end());

        let ratio = new_duration / range.duration();
        let delta = new_duration - range.duration();
        for segment in self.segments.iter_mut() {
            let start = segment.target.start();
            if start >= range.end() {
                segment.target = segment.target.shifted(delta);
            } else if start >= range.start() {
                let new_start = range.start() + (start - range.start()) * ratio;
                let new_len = segment.target.duration() * ratio;
                segment.target = TimeRange::new(new_start, new_len)?;
            }
        }

        debug!(
            "Track {} ({}): scaled {} to {}",
            self.id,
            self.kind.as_str(),
            range,
            new_duration
        );
        Ok(())
    }

    /// Split whichever segment strictly straddles `at`
    fn split_at(&mut self, at: Rational) {
        let position = self
            .segments
            .iter()
            .position(|s| s.target.start() < at && at < s.target.end());
        if let Some(index) = position {
            let (head, tail) = self.segments[index].split_at(at);
            self.segments[index] = head;
            self.segments.insert(index + 1, tail);
        }
    }

    fn sort(&mut self) {
        self.segments.sort_by_key(|s| s.target.start());
    }
}

/// A mutable multi-track timeline assembled from source assets.
///
/// Tracks reference their sources through shared handles; the composition
/// never modifies an asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    tracks: Vec<CompositionTrack>,
    next_track_id: u32,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty track and return it for filling
    pub fn add_track(&mut self, kind: TrackKind) -> &mut CompositionTrack {
        self.next_track_id += 1;
        let index = self.tracks.len();
        self.tracks.push(CompositionTrack::new(self.next_track_id, kind));
        &mut self.tracks[index]
    }

    pub fn tracks(&self) -> &[CompositionTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &CompositionTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn first_track(&self, kind: TrackKind) -> Option<&CompositionTrack> {
        self.tracks_of(kind).next()
    }

    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.first_track(kind).is_some()
    }

    pub fn remove_track(&mut self, id: u32) {
        self.tracks.retain(|t| t.id != id);
    }

    /// Length of the longest track
    pub fn duration(&self) -> Rational {
        self.tracks
            .iter()
            .map(|t| t.duration())
            .max()
            .unwrap_or(Rational::ZERO)
    }

    /// Apply one orientation to every track
    pub fn set_preferred_transform(&mut self, transform: AffineTransform) {
        for track in self.tracks.iter_mut() {
            track.preferred_transform = transform;
        }
    }

    /// Display size of the first video track: the source's natural size
    /// with the track orientation applied.
    pub fn render_size(&self) -> Option<Size> {
        let track = self.first_track(TrackKind::Video)?;
        let segment = track.segments.first()?;
        let source = segment.source.track(segment.source_track)?;
        Some(source.natural_size.applying(&track.preferred_transform))
    }
}
