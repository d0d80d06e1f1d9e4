//! Error types shared across Posetrace crates.

use std::path::PathBuf;

/// Top-level error type for Posetrace operations.
///
/// Configuration problems surface immediately to the caller. Per-frame data
/// problems (`MalformedFrame`) are normally absorbed by the pipeline and only
/// returned from explicit validation helpers.
#[derive(Debug, thiserror::Error)]
pub enum PosetraceError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(
        "Malformed frame: {class} instance {instance} has {actual} landmarks, expected {expected}"
    )]
    MalformedFrame {
        class: String,
        instance: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite landmark: {class} instance {instance} landmark {landmark}")]
    NonFiniteLandmark {
        class: String,
        instance: usize,
        landmark: usize,
    },

    #[error("Detector error: {message}")]
    Detector { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PosetraceError.
pub type PosetraceResult<T> = Result<T, PosetraceError>;

impl PosetraceError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector {
            message: msg.into(),
        }
    }

    pub fn malformed_frame(
        class: impl Into<String>,
        instance: usize,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::MalformedFrame {
            class: class.into(),
            instance,
            expected,
            actual,
        }
    }

    /// Whether this error describes bad per-frame data.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. } | Self::NonFiniteLandmark { .. }
        )
    }

    /// Whether this error came from configuration rather than from data.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
