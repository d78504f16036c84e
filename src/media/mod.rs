//! # Media Assets
//!
//! Read-only handles to source files and the ffmpeg metadata reader that builds them.

mod asset;
mod metadata;

pub use asset::{MediaAsset, MediaTrack, TrackKind};
pub use metadata::load_asset;
