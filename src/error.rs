use thiserror::Error;

/// Main error type for the clipforge library
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("No video track found in {path}")]
    NoVideoTrack { path: String },

    #[error("No audio track found in {path}")]
    NoAudioTrack { path: String },

    #[error("Invalid time range: {details}")]
    InvalidRange { details: String },

    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("Video decoding failed: {reason}")]
    Decode { reason: String },

    #[error("{}", export_failed_message(.reason))]
    ExportFailed { reason: Option<String> },

    #[error("Export cancelled")]
    Cancelled,

    #[error("Another export is already writing to {path}")]
    OutputPathBusy { path: String },

    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

fn export_failed_message(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!("Export failed: {}", reason),
        None => "Export failed".to_string(),
    }
}

/// Convenience type alias for Results using EditorError
pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn invalid_range<S: Into<String>>(details: S) -> Self {
        Self::InvalidRange { details: details.into() }
    }

    pub fn decode<S: Into<String>>(reason: S) -> Self {
        Self::Decode { reason: reason.into() }
    }

    pub fn export_failed<S: Into<String>>(reason: S) -> Self {
        Self::ExportFailed { reason: Some(reason.into()) }
    }

    /// Failure with no detail from the underlying renderer
    pub fn export_failed_unknown() -> Self {
        Self::ExportFailed { reason: None }
    }

    /// Stable category name, always present even when no message is available
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoVideoTrack { .. } => "no_video_track",
            Self::NoAudioTrack { .. } => "no_audio_track",
            Self::InvalidRange { .. } => "invalid_range",
            Self::UnknownFilter { .. } => "unknown_filter",
            Self::Decode { .. } => "decode",
            Self::ExportFailed { .. } => "export_failed",
            Self::Cancelled => "cancelled",
            Self::OutputPathBusy { .. } => "output_path_busy",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Cancellation travels through the same channel as failures but is not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::NoVideoTrack { path } => {
                format!("'{}' has no video track. Pick a file that contains video.", path)
            }
            Self::UnknownFilter { name } => {
                format!("Filter '{}' is not available. Run `clipforge filters` to list them.", name)
            }
            Self::ToolNotFound { tool } => {
                format!("'{}' was not found. Please install FFmpeg or set its path in the config.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_failed_without_reason_is_generic() {
        let err = EditorError::export_failed_unknown();
        assert_eq!(err.to_string(), "Export failed");
        assert_eq!(err.category(), "export_failed");
    }

    #[test]
    fn test_export_failed_keeps_underlying_message() {
        let err = EditorError::export_failed("encoder crashed");
        assert_eq!(err.to_string(), "Export failed: encoder crashed");
    }

    #[test]
    fn test_cancel_is_distinct_from_failure() {
        assert!(EditorError::Cancelled.is_cancellation());
        assert!(!EditorError::export_failed_unknown().is_cancellation());
        assert_ne!(EditorError::Cancelled.category(), EditorError::export_failed_unknown().category());
    }
}
