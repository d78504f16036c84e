//! # Export
//!
//! Asynchronous rendering of assets and compositions to movie files. The
//! [`ExportManager`] owns job lifecycle and output-path exclusivity; a
//! [`Renderer`] does the encoding, by default through `ffmpeg`.

pub mod ffmpeg;
pub mod job;
pub mod manager;
pub mod output;

// Re-exports for convenience
pub use ffmpeg::{FfmpegRenderer, FilterGraph};
pub use job::{is_cancelled, CancellationToken, ExportRequest, ExportSource, ExportStatus, RenderJob};
pub use manager::{ExportHandle, ExportManager, Renderer};
pub use output::{prepare_output_path, save_to_documents, Container, OutputSpec};
