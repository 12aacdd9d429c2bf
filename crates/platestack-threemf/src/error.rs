//! Error types for 3MF packaging.

use thiserror::Error;

/// Errors from archive and thumbnail operations.
#[derive(Error, Debug)]
pub enum ThreeMfError {
    /// ZIP serialization failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Source image has no pixels.
    #[error("image has zero size ({0}x{1})")]
    EmptyImage(u32, u32),

    /// JSON metadata serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background task was cancelled or panicked.
    #[error("task failed: {0}")]
    Task(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for 3MF operations.
pub type Result<T> = std::result::Result<T, ThreeMfError>;
