use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::composition::{Composition, OverlayComposition};
use crate::export::{Container, OutputSpec};
use crate::filters::{FilteredVideo, FrameProcessor};
use crate::media::MediaAsset;
use crate::overlay::RenderTree;

/// Cancellation token shared between a job and its handle.
pub type CancellationToken = Arc<AtomicBool>;

/// Checks if the cancellation token has been triggered.
#[inline]
pub fn is_cancelled(token: &CancellationToken) -> bool {
    token.load(Ordering::SeqCst)
}

/// Lifecycle of one export: `Pending -> Running -> Completed | Failed | Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What gets rendered: an asset as-is, or an edited timeline
#[derive(Debug, Clone)]
pub enum ExportSource {
    Asset(Arc<MediaAsset>),
    Composition(Composition),
}

/// Everything needed to start one export
#[derive(Clone)]
pub struct ExportRequest {
    pub source: ExportSource,
    pub output: OutputSpec,
    pub render_tree: Option<RenderTree>,
    pub frame_processor: Option<Arc<dyn FrameProcessor>>,
}

impl ExportRequest {
    pub fn asset(asset: Arc<MediaAsset>, output: OutputSpec) -> Self {
        Self {
            source: ExportSource::Asset(asset),
            output,
            render_tree: None,
            frame_processor: None,
        }
    }

    pub fn composition(composition: Composition, output: OutputSpec) -> Self {
        Self {
            source: ExportSource::Composition(composition),
            output,
            render_tree: None,
            frame_processor: None,
        }
    }

    /// Filtered video: every frame of the asset runs through the pipeline
    pub fn filtered(video: FilteredVideo, output: OutputSpec) -> Self {
        Self::asset(video.asset, output).with_frame_processor(Arc::new(video.pipeline))
    }

    /// Composition with its overlay burned in
    pub fn overlay(overlay: OverlayComposition, output: OutputSpec) -> Self {
        Self::composition(overlay.composition, output).with_render_tree(overlay.render_tree)
    }

    pub fn with_render_tree(mut self, tree: RenderTree) -> Self {
        self.render_tree = Some(tree);
        self
    }

    pub fn with_frame_processor(mut self, processor: Arc<dyn FrameProcessor>) -> Self {
        self.frame_processor = Some(processor);
        self
    }
}

impl fmt::Debug for ExportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRequest")
            .field("source", &self.source)
            .field("output", &self.output)
            .field("render_tree", &self.render_tree.is_some())
            .field("frame_processor", &self.frame_processor.as_ref().map(|p| p.label()))
            .finish()
    }
}

/// The job a [`Renderer`](crate::export::Renderer) executes
#[derive(Clone)]
pub struct RenderJob {
    pub id: Uuid,
    pub source: ExportSource,
    pub output: PathBuf,
    pub container: Container,
    pub fast_start: bool,
    pub render_tree: Option<RenderTree>,
    pub frame_processor: Option<Arc<dyn FrameProcessor>>,
}

impl RenderJob {
    pub fn new(id: Uuid, request: ExportRequest) -> Self {
        Self {
            id,
            source: request.source,
            output: request.output.path,
            container: request.output.container,
            fast_start: request.output.fast_start,
            render_tree: request.render_tree,
            frame_processor: request.frame_processor,
        }
    }
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("id", &self.id)
            .field("output", &self.output)
            .field("container", &self.container)
            .field("fast_start", &self.fast_start)
            .field("render_tree", &self.render_tree.is_some())
            .field("frame_processor", &self.frame_processor.as_ref().map(|p| p.label()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ExportStatus::Pending.is_terminal());
        assert!(!ExportStatus::Running.is_terminal());
        assert!(ExportStatus::Completed.is_terminal());
        assert!(ExportStatus::Failed.is_terminal());
        assert!(ExportStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_token_observes_cancel() {
        let token: CancellationToken = Arc::new(AtomicBool::new(false));
        let clone = Arc::clone(&token);
        assert!(!is_cancelled(&token));
        clone.store(true, Ordering::SeqCst);
        assert!(is_cancelled(&token));
    }
}
