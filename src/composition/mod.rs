//! # Composition
//!
//! Multi-track timelines assembled from ranges of a source asset, and the
//! builder algorithms behind the editor's trim, speed and text overlay
//! operations. Building is synchronous and does no I/O.

pub mod builder;
pub mod track;

// Re-exports for convenience
pub use builder::{speed_factor, CompositionBuilder, OverlayComposition, SPEED_PRESETS};
pub use track::{Composition, CompositionTrack, Segment, TrackItem};
