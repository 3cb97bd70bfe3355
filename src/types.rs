//! Input and output representations handled by the conversion adapter

use crate::data_uri;
use std::fmt;
use std::path::{Path, PathBuf};

/// An image handed to the conversion adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Path to an encoded image on disk
    FilePath(PathBuf),
    /// `data:image/<fmt>;base64,<payload>` string
    DataUri(String),
    /// Encoded image bytes already in memory
    Bytes(Vec<u8>),
}

impl ImageInput {
    /// Short description used in logs, never the full payload
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::FilePath(path) => format!("file {}", path.display()),
            Self::DataUri(uri) => format!(
                "data URI ({}, {} chars)",
                data_uri::media_type(uri).unwrap_or("unknown"),
                uri.len()
            ),
            Self::Bytes(bytes) => format!("{} raw bytes", bytes.len()),
        }
    }
}

/// Classify a string argument the same way for the CLI and for stdin:
/// anything starting with `data:image` is a data URI, everything else a path.
impl From<&str> for ImageInput {
    fn from(value: &str) -> Self {
        if data_uri::is_image_data_uri(value) {
            Self::DataUri(value.to_string())
        } else {
            Self::FilePath(PathBuf::from(value))
        }
    }
}

impl From<PathBuf> for ImageInput {
    fn from(value: PathBuf) -> Self {
        Self::FilePath(value)
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Result of a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    /// The PNG was written to this path
    FileWritten(PathBuf),
    /// The PNG encoded as `data:image/png;base64,...`
    DataUri(String),
}

impl ImageOutput {
    #[must_use]
    pub fn written_path(&self) -> Option<&Path> {
        match self {
            Self::FileWritten(path) => Some(path),
            Self::DataUri(_) => None,
        }
    }

    #[must_use]
    pub fn as_data_uri(&self) -> Option<&str> {
        match self {
            Self::DataUri(uri) => Some(uri),
            Self::FileWritten(_) => None,
        }
    }
}

impl fmt::Display for ImageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileWritten(path) => write!(f, "{}", path.display()),
            Self::DataUri(uri) => f.write_str(uri),
        }
    }
}
