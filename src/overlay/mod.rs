//! # Overlay Layers
//!
//! Turns a text box authored in the player view (top-down coordinates, gesture
//! transform, visibility window) into a render-space [`RenderTree`] that the
//! exporter composites over the video.

pub mod builder;
pub mod layer;

pub use builder::{OverlayLayerBuilder, TextOverlayRequest};
pub use layer::{
    OpacityAnimation, OverlayStyle, OverlayTransform, RenderTree, TextLayer, VideoLayer,
};
