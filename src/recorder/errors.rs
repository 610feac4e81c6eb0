use std::path::PathBuf;
use thiserror::Error;

/// Errors from the screen-grab side of the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Failed to get monitors: {0}")]
    MonitorError(String),
    #[error("Monitor not found: {0}")]
    MonitorNotFound(String),
    #[error("Failed to capture frame: {0}")]
    GrabFailed(String),
}

/// Errors from the video encoder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("FFmpeg not found. Please install ffmpeg.")]
    FfmpegNotFound,
    #[error("Failed to open output {path:?}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },
    #[error("Failed to write frame {frame}: {reason}")]
    WriteFailed { frame: u64, reason: String },
    #[error("Frame is {got:?}, encoder expects {expected:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("FFmpeg process failed with exit code {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },
    #[error("Encoder already finalized")]
    AlreadyFinalized,
}

/// Errors from the one-shot screenshot command.
#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("Failed to save image: {0}")]
    SaveError(String),
    #[error("Failed to create storage directory: {0}")]
    StorageError(String),
}

/// Top-level error type for recorder operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecorderError {
    #[error("Failed to initialize recording: {0}")]
    Initialization(String),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("Frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),
    #[error("Capture region must be non-empty, got {width}x{height}")]
    InvalidRegion { width: u32, height: u32 },
    #[error("Recording already in progress")]
    AlreadyRecording,
    #[error("No recording in progress")]
    NotRecording,
    #[error("Recording thread panicked")]
    WorkerPanicked,
}

impl RecorderError {
    /// Wraps a setup-time failure as an initialization error.
    pub fn initialization(cause: impl std::fmt::Display) -> Self {
        RecorderError::Initialization(cause.to_string())
    }
}
