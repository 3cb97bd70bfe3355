//! Model cache management for downloaded models
//!
//! Models live in an XDG-compliant directory, one subdirectory per model
//! in Hugging Face layout. Model IDs are derived from the repository URL.

use crate::error::{BgRemovalError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Preprocessing configuration file inside a model directory
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// ONNX model file, relative to the model directory
pub const ONNX_MODEL_FILE: &str = "onnx/model.onnx";

/// Model cache manager
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache manager
    ///
    /// With no override the cache lives in:
    /// - Linux: `~/.cache/remove-bg/models/`
    /// - macOS: `~/Library/Caches/remove-bg/models/`
    /// - Windows: `%LOCALAPPDATA%/remove-bg/models/`
    ///
    /// An override is used as the cache root, models then live in
    /// `<override>/models`. The directory is created on first download,
    /// not here.
    ///
    /// # Errors
    /// - No override given and the platform has no user cache directory
    pub fn new(cache_root: Option<&Path>) -> Result<Self> {
        let cache_dir = match cache_root {
            Some(root) => root.join("models"),
            None => dirs::cache_dir()
                .ok_or_else(|| {
                    BgRemovalError::invalid_config(
                        "Failed to determine cache directory. Set REMOVE_BG_CACHE_DIR environment variable.",
                    )
                })?
                .join("remove-bg")
                .join("models"),
        };

        Ok(Self { cache_dir })
    }

    /// Generate a model ID from a URL
    ///
    /// Converts URLs like `https://huggingface.co/imgly/isnet-general-onnx`
    /// to cache-safe identifiers like `imgly--isnet-general-onnx`
    ///
    /// # Examples
    /// ```
    /// use remove_bg::cache::ModelCache;
    ///
    /// let id = ModelCache::url_to_model_id("https://huggingface.co/imgly/isnet-general-onnx");
    /// assert_eq!(id, "imgly--isnet-general-onnx");
    /// ```
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let prefix = "https://huggingface.co/";
        if let Some(repo) = url.strip_prefix(prefix) {
            repo.trim_end_matches('/').replace('/', "--")
        } else {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(url.as_bytes());
            let hash_string = format!("url-{:x}", hasher.finalize());
            hash_string.get(..16).unwrap_or(&hash_string).to_string()
        }
    }

    /// Check if a model is cached
    ///
    /// # Returns
    /// `true` if the model directory contains both the preprocessing config
    /// and the ONNX model
    #[must_use]
    pub fn is_model_cached(&self, model_id: &str) -> bool {
        Self::validate_model_directory(&self.get_model_path(model_id))
    }

    /// Get the path to a cached model directory (may not exist)
    #[must_use]
    pub fn get_model_path(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(model_id)
    }

    /// Directory holding all cached models
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create the cache directory if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            BgRemovalError::file_io_error("create cache directory", &self.cache_dir, &e)
        })
    }

    /// Validate that a model directory contains required files
    fn validate_model_directory(model_path: &Path) -> bool {
        model_path.join(PREPROCESSOR_CONFIG_FILE).is_file()
            && model_path.join(ONNX_MODEL_FILE).is_file()
    }
}
