//! Error types for the motion detection engine.

/// Everything that can stop a motion detection session.
///
/// An empty frame from the acquisition side is deliberately *not* an error:
/// sources report it as `Ok(None)` and the driver shuts the session down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("video source {source_name} cannot be opened: {reason}")]
    AcquisitionUnavailable { source_name: String, reason: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("frame is {actual_width}x{actual_height}, session expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("frame is {width}x{height}, a frame needs at least one pixel")]
    ZeroSizedFrame { width: u32, height: u32 },

    #[error("frame window holds {buffered} of {capacity} frames, motion cannot be scored yet")]
    WindowNotReady { buffered: usize, capacity: usize },

    #[error("{operation} failed: {message}")]
    Collaborator {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConfigFile(#[from] serde_json::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias used throughout the crate.
pub type MotionResult<T> = Result<T, MotionError>;

impl MotionError {
    pub fn acquisition_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AcquisitionUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Wraps a failure reported by an external image-processing collaborator.
    pub fn collaborator(operation: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            operation,
            message: error.to_string(),
        }
    }

    /// True for the one failure that must end the process with a distinct exit code.
    pub fn is_acquisition_unavailable(&self) -> bool {
        matches!(self, Self::AcquisitionUnavailable { .. })
    }
}
