#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # remove-bg
//!
//! Background removal for image files, base64 data URIs and raw image bytes,
//! backed by the `ISNet` segmentation model running on Tract or ONNX Runtime.
//!
//! The [`ImageConversionAdapter`] normalizes every input into an encoded byte
//! buffer, hands it to a [`BackgroundRemover`] and returns either a written
//! PNG file or a `data:image/png;base64,...` string.
//!
//! ## Features
//!
//! - **Input forms**: file paths, `data:image/<fmt>;base64,` URIs, raw bytes
//! - **Backends**: Tract (pure Rust, default) and ONNX Runtime (`onnx` feature)
//! - **Model Management**: Automatic downloading and caching of models from `HuggingFace`
//! - **CLI Integration**: `remove-bg` binary (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remove_bg::{remove_background, ImageInput, RemovalConfig};
//! use std::path::Path;
//!
//! # fn example() -> remove_bg::Result<()> {
//! let config = RemovalConfig::from_env()?;
//!
//! // File in, file out
//! let input = ImageInput::from(Path::new("photo.jpg").to_path_buf());
//! remove_background(&input, Some(Path::new("photo_no_bg.png")), &config)?;
//!
//! // Data URI in, data URI out
//! let input = ImageInput::from("data:image/jpeg;base64,/9j/4AAQ...");
//! let output = remove_background(&input, None, &config)?;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Reusing a loaded model
//!
//! [`SegmentationRemover`] loads its model on first use and keeps it, so an
//! adapter built once can convert many images:
//!
//! ```rust,no_run
//! use remove_bg::{ImageConversionAdapter, ImageInput, RemovalConfig, SegmentationRemover};
//!
//! # fn example(uris: Vec<String>) -> remove_bg::Result<()> {
//! let mut adapter = ImageConversionAdapter::new(SegmentationRemover::new(RemovalConfig::default()));
//! for uri in uris {
//!     let output = adapter.remove_background(&ImageInput::DataUri(uri), None)?;
//!     println!("{}", output);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust backend
//! - `cli` (default): Command-line interface, progress bars and tracing setup
//! - `onnx`: ONNX Runtime backend
//! - `tracing-json`: JSON log output for the CLI
//! - `webp-support`: WebP input decoding

pub mod adapter;
pub mod backends;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod data_uri;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod remover;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use adapter::{default_output_path, ImageConversionAdapter};
pub use backends::create_backend;
#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
#[cfg(feature = "tract")]
pub use backends::TractBackend;
pub use cache::ModelCache;
pub use config::{BackendType, RemovalConfig, RemovalConfigBuilder, DEFAULT_MODEL_URL};
pub use data_uri::{decode_data_uri, encode_png_data_uri};
pub use download::{validate_model_url, ModelDownloader};
pub use error::{BgRemovalError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelManager, ModelSource, PreprocessingConfig};
pub use remover::{BackgroundRemover, SegmentationRemover};
pub use services::ImageIOService;
pub use types::{ImageInput, ImageOutput};
pub use utils::{ImagePreprocessor, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Remove the background of a single image with a fresh model
///
/// Convenience wrapper around [`ImageConversionAdapter`] and
/// [`SegmentationRemover`]. The model is resolved (and downloaded if needed)
/// on every call; build an adapter yourself to convert several images.
///
/// # Examples
///
/// ```rust,no_run
/// use remove_bg::{remove_background, ImageInput, RemovalConfig};
///
/// # fn example(upload: Vec<u8>) -> remove_bg::Result<()> {
/// let output = remove_background(&ImageInput::Bytes(upload), None, &RemovalConfig::default())?;
/// assert!(output.as_data_uri().is_some());
/// # Ok(())
/// # }
/// ```
pub fn remove_background(
    input: &ImageInput,
    output_path: Option<&std::path::Path>,
    config: &RemovalConfig,
) -> Result<ImageOutput> {
    let mut adapter = ImageConversionAdapter::new(SegmentationRemover::new(config.clone()));
    adapter.remove_background(input, output_path)
}
