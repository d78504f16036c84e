//! Output containers, per-operation path conventions and output-path setup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Mov,
    Mp4,
}

impl Container {
    /// Muxer name passed to `ffmpeg -f`
    pub fn format_name(&self) -> &'static str {
        match self {
            Container::Mov => "mov",
            Container::Mp4 => "mp4",
        }
    }

    /// Guess from a file extension; `.m4v` and unknown extensions are MP4
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "mov" || ext == "qt" => Container::Mov,
            _ => Container::Mp4,
        }
    }
}

/// Where and how an export is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub container: Container,
    /// Move the index to the front of the file for progressive playback
    pub fast_start: bool,
}

impl OutputSpec {
    pub fn new<P: Into<PathBuf>>(path: P, container: Container) -> Self {
        Self { path: path.into(), container, fast_start: false }
    }

    /// Container inferred from the extension
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let container = Container::from_path(&path);
        Self::new(path, container)
    }

    pub fn with_fast_start(mut self, fast_start: bool) -> Self {
        self.fast_start = fast_start;
        self
    }

    /// `{documents}/EffectVideo/EffectVideo_<uuid>.m4v`, QuickTime container
    pub fn filter(config: &ExportConfig) -> Self {
        let path = config
            .documents_dir()
            .join("EffectVideo")
            .join(format!("EffectVideo_{}.m4v", Uuid::new_v4()));
        Self::new(path, Container::Mov)
    }

    /// `{temp}/trimmedVideo_<uuid>.mp4`
    pub fn trim(config: &ExportConfig) -> Self {
        let path = config.temp_dir().join(format!("trimmedVideo_{}.mp4", Uuid::new_v4()));
        Self::new(path, Container::Mp4)
    }

    /// `{temp}/speedEdited_<unix seconds>.mp4`, fast start
    pub fn speed(config: &ExportConfig) -> Self {
        let stamp = chrono::Utc::now().timestamp();
        let path = config.temp_dir().join(format!("speedEdited_{}.mp4", stamp));
        Self::new(path, Container::Mp4).with_fast_start(true)
    }

    /// `{temp}/final_overlay.mov`, fast start. The name is fixed, so each
    /// overlay export replaces the previous one.
    pub fn overlay(config: &ExportConfig) -> Self {
        Self::new(config.temp_dir().join("final_overlay.mov"), Container::Mov).with_fast_start(true)
    }
}

/// Create missing parent directories and delete any file already at `path`
pub fn prepare_output_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed existing output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Best-effort cleanup of a partial output
pub fn remove_partial_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}

/// Copy a finished export to `{documents}/SavedVideo_<uuid>.mp4`
pub fn save_to_documents(source: &Path, config: &ExportConfig) -> Result<PathBuf> {
    let destination = config
        .documents_dir()
        .join(format!("SavedVideo_{}.mp4", Uuid::new_v4()));
    prepare_output_path(&destination)?;
    fs::copy(source, &destination)?;
    info!("💾 Saved {} to {}", source.display(), destination.display());
    Ok(destination)
}
