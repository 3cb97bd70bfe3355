//! Model downloading functionality for `HuggingFace` repositories
//!
//! Downloads are blocking, land in a temporary directory inside the cache
//! and are renamed into place only once every file arrived.

use crate::cache::{ModelCache, ONNX_MODEL_FILE, PREPROCESSOR_CONFIG_FILE};
use crate::error::{BgRemovalError, Result};
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

const HUGGINGFACE_PREFIX: &str = "https://huggingface.co/";

/// Files fetched for every model, in download order
const MODEL_FILES: &[&str] = &[PREPROCESSOR_CONFIG_FILE, ONNX_MODEL_FILE];

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
pub enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    /// Set message for progress indicator
    pub fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_message(msg),
            Self::NoOp => {
                let _ = msg;
            },
        }
    }

    /// Set length and position for progress indicator
    pub fn set_progress(&self, position: u64, length: Option<u64>) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => {
                if let Some(len) = length {
                    pb.set_length(len);
                }
                pb.set_position(position);
            },
            Self::NoOp => {
                let _ = (position, length);
            },
        }
    }

    /// Finish progress indicator with message
    pub fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_with_message(msg),
            Self::NoOp => {
                let _ = msg;
            },
        }
    }
}

/// Model downloader with progress reporting
#[derive(Debug)]
pub struct ModelDownloader {
    client: Client,
    cache: ModelCache,
    show_progress: bool,
}

impl ModelDownloader {
    /// Create a new model downloader writing into `cache`
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(cache: ModelCache) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 minute timeout
            .build()
            .map_err(|e| BgRemovalError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            cache,
            show_progress: false,
        })
    }

    /// Show a progress bar on stderr while downloading
    ///
    /// Has no visible effect without the `cli` feature or when stderr is
    /// not a terminal.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Download a model from a URL to the cache
    ///
    /// Returns the model ID. An already cached model is not downloaded again.
    ///
    /// # Errors
    /// - Invalid or unsupported URL format
    /// - Network errors during download
    /// - File system errors during caching
    pub fn download_model(&self, url: &str) -> Result<String> {
        validate_model_url(url)?;

        let model_id = ModelCache::url_to_model_id(url);
        if self.cache.is_model_cached(&model_id) {
            log::info!("Model already cached: {}", model_id);
            return Ok(model_id);
        }

        log::info!("Downloading model {} from {}", model_id, url);
        self.cache.ensure_exists()?;

        // Same filesystem as the final location so the rename is atomic
        let temp_dir = tempfile::Builder::new()
            .prefix(".download-")
            .tempdir_in(self.cache.cache_dir())
            .map_err(|e| {
                BgRemovalError::file_io_error("create temp directory", self.cache.cache_dir(), &e)
            })?;

        let progress = if self.show_progress {
            Self::create_progress_indicator()
        } else {
            ProgressIndicator::NoOp
        };

        let raw_base = format!("{}/resolve/main/", url.trim_end_matches('/'));
        for file_name in MODEL_FILES {
            progress.set_message(format!("Downloading {file_name}"));
            let file_url = format!("{raw_base}{file_name}");
            if let Err(e) = self.download_file(&file_url, &temp_dir.path().join(file_name), &progress) {
                progress.finish_with_message("Download failed".to_string());
                return Err(e);
            }
        }

        let final_dir = self.cache.get_model_path(&model_id);
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir).map_err(|e| {
                BgRemovalError::file_io_error("remove existing model directory", &final_dir, &e)
            })?;
        }
        fs::rename(temp_dir.path(), &final_dir).map_err(|e| {
            BgRemovalError::file_io_error("move downloaded model to cache", &final_dir, &e)
        })?;

        progress.finish_with_message(format!("Downloaded {model_id}"));
        log::info!("Successfully downloaded model: {}", model_id);
        Ok(model_id)
    }

    /// Create a progress indicator for download reporting
    fn create_progress_indicator() -> ProgressIndicator {
        #[cfg(feature = "cli")]
        {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            ProgressIndicator::Indicatif(pb)
        }
        #[cfg(not(feature = "cli"))]
        {
            ProgressIndicator::NoOp
        }
    }

    /// Download a single file with progress reporting
    fn download_file(&self, url: &str, local_path: &Path, progress: &ProgressIndicator) -> Result<()> {
        log::debug!("Downloading: {} -> {}", url, local_path.display());

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BgRemovalError::file_io_error("create directory", parent, &e))?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| BgRemovalError::network_error(format!("Failed to download {url}"), e))?;

        if !response.status().is_success() {
            return Err(BgRemovalError::network_error(
                format!("Failed to download {url}"),
                format!("HTTP {}", response.status()),
            ));
        }

        let total_size = response.content_length();
        let mut file = fs::File::create(local_path)
            .map_err(|e| BgRemovalError::file_io_error("create file", local_path, &e))?;

        let mut hasher = Sha256::new();
        let mut downloaded = 0u64;
        let mut buffer = vec![0; 8192]; // 8KB buffer

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| BgRemovalError::network_error("Failed to read download stream", e))?;

            if bytes_read == 0 {
                break; // EOF
            }

            let chunk = buffer.get(..bytes_read).unwrap_or(&[]);
            file.write_all(chunk)
                .map_err(|e| BgRemovalError::file_io_error("write to file", local_path, &e))?;
            hasher.update(chunk);

            downloaded += bytes_read as u64;
            progress.set_progress(downloaded, total_size);
        }

        file.flush()
            .map_err(|e| BgRemovalError::file_io_error("flush file", local_path, &e))?;

        log::debug!(
            "Downloaded {} bytes to {} (sha256 {:x})",
            downloaded,
            local_path.display(),
            hasher.finalize()
        );
        Ok(())
    }

    /// Get the model cache for other operations
    #[must_use]
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}

/// Validate that a URL is a supported model repository
///
/// Currently only `HuggingFace` repositories are supported.
///
/// # Errors
/// - Empty URL, non-`HuggingFace` host or missing `user/repo` path
pub fn validate_model_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(BgRemovalError::invalid_config("Model URL cannot be empty"));
    }

    let Some(repo_path) = url.strip_prefix(HUGGINGFACE_PREFIX) else {
        return Err(BgRemovalError::invalid_config(format!(
            "Unsupported URL format: {url}. Only HuggingFace repositories are supported (https://huggingface.co/...)"
        )));
    };

    let mut parts = repo_path.trim_end_matches('/').split('/');
    match (parts.next(), parts.next()) {
        (Some(user), Some(repo)) if !user.is_empty() && !repo.is_empty() => Ok(()),
        _ => Err(BgRemovalError::invalid_config(format!(
            "Invalid HuggingFace repository URL: {url}. Expected format: https://huggingface.co/username/repo-name"
        ))),
    }
}
