//! # Video Frames
//!
//! Raster frame type and sequential frame extraction from media assets.

pub mod frames;
pub mod types;

pub use frames::{extract_frames, extract_frames_from, thumbnail, thumbnail_time, DecoderPipe, FrameReader};
pub use types::Frame;
