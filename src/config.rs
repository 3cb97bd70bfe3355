//! Configuration types for background removal operations

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default ISNet model repository
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";

/// Inference backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Tract (pure Rust, no external dependencies)
    Tract,
    /// ONNX Runtime (requires the `onnx` feature)
    Onnx,
}

impl Default for BackendType {
    fn default() -> Self {
        Self::Tract
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tract => write!(f, "tract"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

impl FromStr for BackendType {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" => Ok(Self::Tract),
            "onnx" => Ok(Self::Onnx),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown backend '{other}' (expected 'tract' or 'onnx')"
            ))),
        }
    }
}

/// Configuration for the segmentation-based background remover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Inference backend used to run the model
    pub backend: BackendType,

    /// Hugging Face repository the model is downloaded from
    pub model_url: String,

    /// Local model directory; bypasses the cache and downloads entirely
    pub model_dir: Option<PathBuf>,

    /// Cache root override (models live in `<cache_dir>/models`)
    pub cache_dir: Option<PathBuf>,

    /// Download the model on first use when it is not cached
    pub auto_download: bool,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_dir: None,
            cache_dir: None,
            auto_download: true,
            intra_threads: 0,
        }
    }
}

impl RemovalConfig {
    /// Environment variable selecting the backend
    pub const ENV_BACKEND: &'static str = "REMOVE_BG_BACKEND";
    /// Environment variable overriding the model repository URL
    pub const ENV_MODEL_URL: &'static str = "REMOVE_BG_MODEL_URL";
    /// Environment variable pointing at a local model directory
    pub const ENV_MODEL_DIR: &'static str = "REMOVE_BG_MODEL_DIR";
    /// Environment variable overriding the cache root
    pub const ENV_CACHE_DIR: &'static str = "REMOVE_BG_CACHE_DIR";
    /// Environment variable disabling model downloads
    pub const ENV_OFFLINE: &'static str = "REMOVE_BG_OFFLINE";
    /// Environment variable setting the intra-op thread count
    pub const ENV_THREADS: &'static str = "REMOVE_BG_THREADS";

    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use remove_bg::{BackendType, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .backend(BackendType::Tract)
    ///     .auto_download(false)
    ///     .build()
    ///     .unwrap();
    /// assert!(!config.auto_download);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Build a configuration from the process environment
    ///
    /// # Errors
    /// - Unparseable variable values
    /// - The resulting configuration fails [`RemovalConfig::validate`]
    pub fn from_env() -> Result<Self> {
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    ///
    /// Unset and empty variables keep their defaults.
    ///
    /// # Errors
    /// - Unparseable variable values
    /// - The resulting configuration fails [`RemovalConfig::validate`]
    pub fn from_env_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(backend) = get(Self::ENV_BACKEND) {
            builder = builder.backend(backend.parse()?);
        }
        if let Some(url) = get(Self::ENV_MODEL_URL) {
            builder = builder.model_url(url);
        }
        if let Some(dir) = get(Self::ENV_MODEL_DIR) {
            builder = builder.model_dir(dir);
        }
        if let Some(dir) = get(Self::ENV_CACHE_DIR) {
            builder = builder.cache_dir(dir);
        }
        if let Some(offline) = get(Self::ENV_OFFLINE) {
            builder = builder.auto_download(!parse_flag(Self::ENV_OFFLINE, &offline)?);
        }
        if let Some(threads) = get(Self::ENV_THREADS) {
            let threads = threads.trim().parse::<usize>().map_err(|e| {
                BgRemovalError::invalid_config(format!(
                    "{} must be a non-negative integer, got '{threads}': {e}",
                    Self::ENV_THREADS
                ))
            })?;
            builder = builder.intra_threads(threads);
        }

        builder.build()
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    /// - `model_url` is not a Hugging Face repository and no `model_dir` is set
    pub fn validate(&self) -> Result<()> {
        if self.model_dir.is_none() {
            crate::download::validate_model_url(&self.model_url)?;
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(BgRemovalError::invalid_config(format!(
            "{name} must be a boolean flag, got '{other}'"
        ))),
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Set inference backend
    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set model repository URL
    #[must_use]
    pub fn model_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.model_url = url.into();
        self
    }

    /// Use a local model directory
    #[must_use]
    pub fn model_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.model_dir = Some(dir.into());
        self
    }

    /// Override the cache root
    #[must_use]
    pub fn cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Enable or disable downloading a missing model
    #[must_use]
    pub fn auto_download(mut self, enabled: bool) -> Self {
        self.config.auto_download = enabled;
        self
    }

    /// Set number of intra-op threads
    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Validation failures, see [`RemovalConfig::validate`]
    pub fn build(self) -> Result<RemovalConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
