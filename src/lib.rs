//! # Clipforge
//!
//! Single-source video editing: trims, speed ramps, named image filters and
//! animated text overlays, rendered to MOV/MP4 files.
//!
//! Edits are built as in-memory compositions with exact rational timing and
//! only touch the disk when exported.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clipforge::{
//!     composition::CompositionBuilder,
//!     config::Config,
//!     export::{ExportManager, ExportRequest, OutputSpec},
//!     media::load_asset,
//!     time::Rational,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let asset = Arc::new(load_asset("clip.mp4".as_ref(), &config.tools)?);
//!
//! let composition = CompositionBuilder::from_config(&config).trim(
//!     &asset,
//!     Rational::from_integer(2),
//!     Rational::from_integer(5),
//! )?;
//!
//! let manager = ExportManager::with_ffmpeg(&config);
//! let handle = manager.export(ExportRequest::composition(
//!     composition,
//!     OutputSpec::trim(&config.export),
//! ))?;
//! let output = handle.finished().await?;
//! println!("trimmed to {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`time`] - Rational timestamps and half-open time ranges
//! - [`geometry`] - Points, sizes, rects and affine transforms
//! - [`media`] - Source assets and ffprobe loading
//! - [`video`] - Raster frames and sequential frame extraction
//! - [`filters`] - Built-in image effects for stills and whole videos
//! - [`composition`] - Multi-track timelines and the trim/speed/overlay builders
//! - [`overlay`] - Text overlay mapping from view space to render space
//! - [`export`] - Asynchronous rendering with status, cancellation and path guards
//! - [`config`] - Configuration management
//!
//! ## Custom Filters
//!
//! Swap the implementation behind a filter name by implementing
//! [`ImageFilter`](filters::ImageFilter) and registering it:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clipforge::filters::{FilterName, FilterRegistry, ImageFilter};
//! use image::RgbImage;
//!
//! struct HardNoir;
//!
//! impl ImageFilter for HardNoir {
//!     fn name(&self) -> FilterName {
//!         FilterName::PhotoEffectNoir
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Black or white by luminance"
//!     }
//!
//!     fn apply(&self, image: &RgbImage) -> RgbImage {
//!         let mut out = image.clone();
//!         for pixel in out.pixels_mut() {
//!             let sum: u32 = pixel.0.iter().map(|&c| c as u32).sum();
//!             pixel.0 = if sum > 381 { [255; 3] } else { [0; 3] };
//!         }
//!         out
//!     }
//! }
//!
//! let mut registry = FilterRegistry::new();
//! registry.register(FilterName::PhotoEffectNoir, || Arc::new(HardNoir));
//! ```

pub mod composition;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod geometry;
pub mod media;
pub mod overlay;
pub mod time;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{Composition, CompositionBuilder},
    config::Config,
    error::{EditorError, Result},
    export::{ExportHandle, ExportManager, ExportRequest, ExportStatus, OutputSpec},
    filters::{FilterName, FilterRegistry, ImageFilter},
    media::{load_asset, MediaAsset},
    overlay::{OverlayTransform, TextOverlayRequest},
    time::{Rational, TimeRange},
};
