//! Error types for background removal operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error types for conversion and background removal operations
///
/// The first four variants are what the conversion adapter reports to its
/// callers. The remaining variants originate inside a remover and are folded
/// into [`BgRemovalError::Processing`] by the adapter.
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// The input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A data URI without a `,` separator or with an undecodable payload
    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    /// Input/output errors (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any failure inside the background remover
    #[error("Processing error: {0}")]
    Processing(String),

    /// Image decode or encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Model resolution or loading errors
    #[error("Model error: {0}")]
    Model(String),

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model download errors
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BgRemovalError {
    /// Create a new malformed data URI error
    pub fn malformed_data_uri<S: Into<String>>(msg: S) -> Self {
        Self::MalformedDataUri(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    ///
    /// A `NotFound` error becomes [`BgRemovalError::FileNotFound`] so callers
    /// can tell a missing input apart from other I/O failures.
    pub fn file_io_error<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        let path = path.as_ref();
        if error.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound(path.to_path_buf());
        }

        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path.display(), error),
        ))
    }

    /// Create network error with request context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Fold any remover failure into [`BgRemovalError::Processing`]
    ///
    /// Cache and model I/O failures are wrapped too, so `FileNotFound` and
    /// `Io` from the adapter always refer to the caller's own files.
    #[must_use]
    pub fn into_processing(self) -> Self {
        match self {
            Self::Processing(_) => self,
            other => Self::Processing(other.to_string()),
        }
    }
}
