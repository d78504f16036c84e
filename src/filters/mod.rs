//! # Filter Engine
//!
//! A fixed vocabulary of 21 built-in image effects, applied either to a single
//! still (thumbnails, previews) or to every frame of a video during export.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clipforge::filters::apply_filter;
//!
//! let still = image::open("thumb.png").unwrap().to_rgb8();
//! let noir = apply_filter("CIPhotoEffectNoir", &still).unwrap();
//! assert_eq!(noir.dimensions(), still.dimensions());
//! ```

pub mod effects;
pub mod name;
pub mod pipeline;
pub mod registry;
pub mod traits;

pub use name::FilterName;
pub use pipeline::{
    apply_filter, apply_filter_to_video, apply_filter_with, filter_thumbnail, FilteredVideo,
    FrameProcessor, VideoFilterPipeline,
};
pub use registry::FilterRegistry;
pub use traits::ImageFilter;
