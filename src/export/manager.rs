use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::export::output::{prepare_output_path, remove_partial_output};
use crate::export::{
    is_cancelled, CancellationToken, ExportRequest, ExportStatus, FfmpegRenderer, RenderJob,
};

/// Executes render jobs. Implementations block; the manager runs them on
/// the blocking thread pool.
pub trait Renderer: Send + Sync + 'static {
    /// Write `job.output`. Poll `cancel` regularly and return
    /// [`EditorError::Cancelled`] once it is set.
    fn render(&self, job: &RenderJob, cancel: &CancellationToken) -> Result<()>;
}

type InFlight = Arc<Mutex<HashSet<PathBuf>>>;

/// Runs exports in the background and reports each outcome exactly once.
///
/// Only one export may target a given output path at a time; a second
/// submission is refused with [`EditorError::OutputPathBusy`].
#[derive(Clone)]
pub struct ExportManager {
    renderer: Arc<dyn Renderer>,
    in_flight: InFlight,
}

impl ExportManager {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Manager backed by the external `ffmpeg` tool
    pub fn with_ffmpeg(config: &Config) -> Self {
        Self::new(Arc::new(FfmpegRenderer::new(config.tools.clone(), config.export.clone())))
    }

    /// Number of exports currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_busy(&self, path: &Path) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(path))
            .unwrap_or(false)
    }

    /// Submit an export and return immediately.
    ///
    /// Only submission problems (busy path, no runtime) are returned here.
    /// Everything from output-path setup onwards arrives through
    /// [`ExportHandle::finished`]. Must be called from within a Tokio runtime.
    pub fn export(&self, request: ExportRequest) -> Result<ExportHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| EditorError::export_failed("export must be started inside a Tokio runtime"))?;

        let output = request.output.path.clone();
        {
            let mut set = self
                .in_flight
                .lock()
                .map_err(|_| EditorError::export_failed("export registry poisoned"))?;
            if !set.insert(output.clone()) {
                return Err(EditorError::OutputPathBusy { path: output.display().to_string() });
            }
        }

        let id = Uuid::new_v4();
        let job = RenderJob::new(id, request);
        let cancel: CancellationToken = Arc::new(AtomicBool::new(false));
        let (status_tx, status_rx) = watch::channel(ExportStatus::Pending);
        let (result_tx, result_rx) = oneshot::channel();

        info!("📦 Export {} queued -> {}", id, output.display());
        debug!("Export {} job: {:?}", id, job);

        let renderer = Arc::clone(&self.renderer);
        let in_flight = Arc::clone(&self.in_flight);
        let token = Arc::clone(&cancel);
        runtime.spawn(async move {
            let _ = status_tx.send(ExportStatus::Running);
            info!("🎬 Export {} running", id);

            let output = job.output.clone();
            let blocking_token = Arc::clone(&token);
            let outcome = tokio::task::spawn_blocking(move || run_job(renderer.as_ref(), &job, &blocking_token)).await;

            let result = match outcome {
                Ok(Ok(())) => Ok(output.clone()),
                Ok(Err(e)) => Err(e),
                Err(join_error) => Err(EditorError::export_failed(format!(
                    "render task ended abnormally: {}",
                    join_error
                ))),
            };
            // A render that fails after a cancel request counts as cancelled
            let result = match result {
                Err(e) if is_cancelled(&token) && !e.is_cancellation() => {
                    debug!("Export {} failed after cancel: {}", id, e);
                    Err(EditorError::Cancelled)
                }
                other => other,
            };

            let status = match &result {
                Ok(_) => ExportStatus::Completed,
                Err(e) if e.is_cancellation() => ExportStatus::Cancelled,
                Err(_) => ExportStatus::Failed,
            };
            if result.is_err() {
                remove_partial_output(&output);
            }
            match &result {
                Ok(path) => info!("✅ Export {} completed: {}", id, path.display()),
                Err(e) if e.is_cancellation() => warn!("Export {} cancelled", id),
                Err(e) => error!("Export {} failed ({}): {}", id, e.category(), e),
            }

            if let Ok(mut set) = in_flight.lock() {
                set.remove(&output);
            }
            let _ = status_tx.send(status);
            if result_tx.send(result).is_err() {
                debug!("Export {} finished with nobody waiting", id);
            }
        });

        Ok(ExportHandle {
            id,
            output,
            status: status_rx,
            cancel,
            result: result_rx,
        })
    }
}

fn run_job(renderer: &dyn Renderer, job: &RenderJob, cancel: &CancellationToken) -> Result<()> {
    // Setup failures are export failures, not a separate category
    prepare_output_path(&job.output).map_err(|e| {
        EditorError::export_failed(format!("preparing {}: {}", job.output.display(), e))
    })?;
    if is_cancelled(cancel) {
        return Err(EditorError::Cancelled);
    }
    renderer.render(job, cancel)
}

/// Caller's side of one export
pub struct ExportHandle {
    id: Uuid,
    output: PathBuf,
    status: watch::Receiver<ExportStatus>,
    cancel: CancellationToken,
    result: oneshot::Receiver<Result<PathBuf>>,
}

impl ExportHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Latest published status
    pub fn status(&self) -> ExportStatus {
        *self.status.borrow()
    }

    /// Receiver for observing status changes (e.g. to drive a spinner)
    pub fn subscribe(&self) -> watch::Receiver<ExportStatus> {
        self.status.clone()
    }

    /// Request cancellation. The outcome still arrives through
    /// [`ExportHandle::finished`].
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Token that cancels this export when set
    pub fn cancellation_token(&self) -> CancellationToken {
        Arc::clone(&self.cancel)
    }

    /// Wait for the export to end: the output path on success, otherwise the
    /// error (or [`EditorError::Cancelled`]).
    pub async fn finished(self) -> Result<PathBuf> {
        match self.result.await {
            Ok(result) => result,
            Err(_) => Err(EditorError::export_failed_unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::OutputSpec;
    use crate::geometry::Size;
    use crate::media::{MediaAsset, MediaTrack};
    use crate::time::Rational;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Writes a marker file, optionally after waiting for cancellation
    struct FakeRenderer {
        wait_for_cancel: bool,
        fail_with: Option<Option<String>>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, job: &RenderJob, cancel: &CancellationToken) -> Result<()> {
            fs::write(&job.output, b"partial")?;
            if self.wait_for_cancel {
                while !is_cancelled(cancel) {
                    std::thread::sleep(Duration::from_millis(5));
                }
                return Err(EditorError::Cancelled);
            }
            match &self.fail_with {
                Some(Some(reason)) => Err(EditorError::export_failed(reason.clone())),
                Some(None) => Err(EditorError::export_failed_unknown()),
                None => {
                    fs::write(&job.output, b"rendered")?;
                    Ok(())
                }
            }
        }
    }

    fn manager(wait_for_cancel: bool, fail_with: Option<Option<String>>) -> ExportManager {
        ExportManager::new(Arc::new(FakeRenderer { wait_for_cancel, fail_with }))
    }

    fn request(path: &Path) -> ExportRequest {
        let asset = Arc::new(MediaAsset::new(
            "clip.mp4",
            Rational::from_integer(10),
            vec![MediaTrack::video(0, Size::new(64.0, 64.0))],
        ));
        ExportRequest::asset(asset, OutputSpec::from_path(path))
    }

    #[tokio::test]
    async fn test_export_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        fs::write(&path, b"stale").unwrap();

        let handle = manager(false, None).export(request(&path)).unwrap();
        let output = handle.finished().await.unwrap();

        assert_eq!(output, path);
        assert_eq!(fs::read(&path).unwrap(), b"rendered");
    }

    #[tokio::test]
    async fn test_export_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.mov");
        let output = manager(false, None).export(request(&path)).unwrap().finished().await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_status_reaches_completed() {
        let dir = tempdir().unwrap();
        let handle = manager(false, None).export(request(&dir.path().join("a.mp4"))).unwrap();
        let mut status = handle.subscribe();
        handle.finished().await.unwrap();
        status.changed().await.ok();
        assert_eq!(*status.borrow(), ExportStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_reports_cancelled_and_cleans_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let handle = manager(true, None).export(request(&path)).unwrap();
        let status = handle.subscribe();

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
        let result = handle.finished().await;

        assert!(matches!(result, Err(EditorError::Cancelled)));
        assert_eq!(*status.borrow(), ExportStatus::Cancelled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failure_carries_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let result = manager(false, Some(Some("encoder exploded".to_string())))
            .export(request(&path))
            .unwrap()
            .finished()
            .await;

        match result {
            Err(EditorError::ExportFailed { reason }) => assert_eq!(reason.as_deref(), Some("encoder exploded")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failure_without_reason_is_generic() {
        let dir = tempdir().unwrap();
        let result = manager(false, Some(None))
            .export(request(&dir.path().join("out.mp4")))
            .unwrap()
            .finished()
            .await;
        match result {
            Err(e @ EditorError::ExportFailed { reason: None }) => assert_eq!(e.category(), "export_failed"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_path_is_rejected_while_running() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let manager = manager(true, None);

        let first = manager.export(request(&path)).unwrap();
        assert!(manager.is_busy(&path));
        assert!(matches!(
            manager.export(request(&path)),
            Err(EditorError::OutputPathBusy { .. })
        ));

        // A different path is fine
        let other = manager.export(request(&dir.path().join("other.mp4"))).unwrap();
        assert_eq!(manager.in_flight(), 2);

        first.cancel();
        other.cancel();
        let _ = first.finished().await;
        let _ = other.finished().await;
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_output_setup_failure_goes_through_result() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let handle = manager(false, None).export(request(&blocker.join("out.mp4"))).unwrap();
        match handle.finished().await {
            Err(e @ EditorError::ExportFailed { reason: Some(_) }) => {
                assert_eq!(e.category(), "export_failed");
                assert!(e.to_string().contains("preparing"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_export_outside_runtime_is_an_error() {
        let dir = tempdir().unwrap();
        let result = manager(false, None).export(request(&dir.path().join("out.mp4")));
        assert!(matches!(result, Err(EditorError::ExportFailed { .. })));
    }
}
