use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for clipforge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Export and encoding settings
    pub export: ExportConfig,

    /// Text overlay defaults
    pub overlay: OverlayConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.tools.validate()?;
        self.export.validate()?;
        self.overlay.validate()?;
        Ok(())
    }
}

/// Locations of the ffmpeg binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<()> {
        for (key, path) in [("tools.ffmpeg", &self.ffmpeg), ("tools.ffprobe", &self.ffprobe)] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: String::new(),
                }.into());
            }
        }
        Ok(())
    }
}

/// Worst x264 CRF, used for quality 0
const MAX_CRF: u8 = 51;
/// CRF used for quality 100
const BEST_CRF: u8 = 18;

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Scratch directory for trim/speed/overlay outputs (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,

    /// Persistent directory for filtered and saved videos (user documents if unset)
    pub documents_dir: Option<PathBuf>,

    /// Video codec passed to ffmpeg
    pub video_codec: String,

    /// Audio codec used when audio has to be re-encoded
    pub audio_codec: String,

    /// Quality setting (0-100, higher is better; 100 is "highest available")
    pub quality: u8,

    /// Encoder thread count
    pub encoder_threads: usize,

    /// Frame rate of overlay renders
    pub overlay_frame_rate: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            documents_dir: None,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            quality: 100,
            encoder_threads: num_cpus::get(),
            overlay_frame_rate: 30,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "export.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        if self.encoder_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.encoder_threads".to_string(),
                value: self.encoder_threads.to_string()
            }.into());
        }

        if self.overlay_frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.overlay_frame_rate".to_string(),
                value: self.overlay_frame_rate.to_string()
            }.into());
        }

        if self.video_codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "export.video_codec".to_string(),
                value: self.video_codec.clone()
            }.into());
        }

        Ok(())
    }

    /// Map the 0-100 quality scale onto x264 CRF 51..=18.
    ///
    /// 100 stops at the visually lossless CRF 18; CRF 0 would switch x264 to
    /// lossless High 4:4:4, which most players cannot decode.
    pub fn crf(&self) -> u8 {
        let span = (MAX_CRF - BEST_CRF) as u32;
        let quality = self.quality.min(100) as u32;
        MAX_CRF - ((quality * span + 50) / 100) as u8
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .or_else(dirs::document_dir)
            .unwrap_or_else(|| self.temp_dir())
    }
}

/// Text overlay defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub font_family: String,

    /// Font size in render-space points
    pub font_size: f64,

    /// Text color as RGBA
    pub text_color: [u8; 4],

    /// Box color behind the text as RGBA
    pub background_color: [u8; 4],

    /// Seconds added to the fade begin time when the window starts near zero
    pub zero_start_bias: f64,

    /// Start times below this many seconds receive `zero_start_bias`
    pub zero_start_window: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_family: "Helvetica-Bold".to_string(),
            font_size: 90.0,
            text_color: [0, 0, 0, 255],
            background_color: [255, 255, 255, 255],
            zero_start_bias: 0.1,
            zero_start_window: 1.0,
        }
    }
}

impl OverlayConfig {
    fn validate(&self) -> Result<()> {
        if !(self.font_size > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "overlay.font_size".to_string(),
                value: self.font_size.to_string()
            }.into());
        }

        if self.zero_start_bias < 0.0 || self.zero_start_window < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "overlay.zero_start".to_string(),
                value: format!("{}/{}", self.zero_start_bias, self.zero_start_window)
            }.into());
        }

        Ok(())
    }
}
