//! Model resolution and preprocessing metadata

use crate::{
    cache::{ModelCache, ONNX_MODEL_FILE, PREPROCESSOR_CONFIG_FILE},
    config::RemovalConfig,
    download::ModelDownloader,
    error::{BgRemovalError, Result},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a resolved model came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    /// External model from filesystem path
    External(PathBuf),
    /// Downloaded model from cache by model ID
    Downloaded(String),
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            ModelSource::External(path) => {
                format!(
                    "external:{}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                )
            },
            ModelSource::Downloaded(model_id) => format!("cached:{model_id}"),
        }
    }
}

/// Model input preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Model input size as `[height, width]`
    pub target_size: [u32; 2],
    /// Per-channel mean on a 0-1 scale
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation on a 0-1 scale
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    /// ISNet defaults
    fn default() -> Self {
        Self {
            target_size: [1024, 1024],
            normalization_mean: [128.0 / 255.0; 3],
            normalization_std: [256.0 / 255.0; 3],
        }
    }
}

/// `preprocessor_config.json` as published on Hugging Face
///
/// Mean and standard deviation are on a 0-255 scale.
#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFacePreprocessor {
    pub size: ImageSize,
    pub image_mean: Vec<f32>,
    pub image_std: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

impl TryFrom<HuggingFacePreprocessor> for PreprocessingConfig {
    type Error = BgRemovalError;

    fn try_from(value: HuggingFacePreprocessor) -> Result<Self> {
        let channels = |name: &str, values: &[f32]| -> Result<[f32; 3]> {
            match values {
                [a, b, c, ..] => Ok([a / 255.0, b / 255.0, c / 255.0]),
                _ => Err(BgRemovalError::model(format!(
                    "{name} must have at least 3 values"
                ))),
            }
        };

        let normalization_std = channels("image_std", &value.image_std)?;
        if normalization_std.iter().any(|s| *s <= 0.0) {
            return Err(BgRemovalError::model("image_std values must be positive"));
        }
        if value.size.height == 0 || value.size.width == 0 {
            return Err(BgRemovalError::model("size must be non-zero"));
        }

        Ok(Self {
            target_size: [value.size.height, value.size.width],
            normalization_mean: channels("image_mean", &value.image_mean)?,
            normalization_std,
        })
    }
}

impl PreprocessingConfig {
    /// Parse a `preprocessor_config.json` file
    ///
    /// # Errors
    /// - The file cannot be read
    /// - Invalid JSON or missing `size`, `image_mean`, `image_std`
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BgRemovalError::file_io_error("read preprocessor config", path, &e))?;
        let raw: HuggingFacePreprocessor = serde_json::from_str(&contents).map_err(|e| {
            BgRemovalError::model(format!(
                "Invalid preprocessor config {}: {e}",
                path.display()
            ))
        })?;
        raw.try_into()
    }
}

/// A resolved model ready to be loaded by an inference backend
#[derive(Debug, Clone)]
pub struct ModelManager {
    source: ModelSource,
    model_file: PathBuf,
    preprocessing: PreprocessingConfig,
}

impl ModelManager {
    /// Resolve the model named by `config`
    ///
    /// An explicit `model_dir` wins. Otherwise the model for `model_url` is
    /// looked up in the cache and downloaded when missing, unless
    /// `auto_download` is off.
    ///
    /// # Errors
    /// - The model is not cached and downloads are disabled
    /// - Download failures
    /// - Invalid model directory layout or preprocessing config
    pub fn resolve(config: &RemovalConfig) -> Result<Self> {
        if let Some(dir) = &config.model_dir {
            return Self::from_dir(dir);
        }

        let cache = ModelCache::new(config.cache_dir.as_deref())?;
        let model_id = ModelCache::url_to_model_id(&config.model_url);

        if !cache.is_model_cached(&model_id) {
            if !config.auto_download {
                return Err(BgRemovalError::model(format!(
                    "Model '{}' is not cached in {} and downloads are disabled (unset {} to allow them)",
                    model_id,
                    cache.cache_dir().display(),
                    RemovalConfig::ENV_OFFLINE
                )));
            }

            let _span = tracing::info_span!("download", model_id = %model_id).entered();
            ModelDownloader::new(cache.clone())?
                .with_progress(cfg!(feature = "cli"))
                .download_model(&config.model_url)?;
        }

        let mut manager = Self::from_dir(cache.get_model_path(&model_id))?;
        manager.source = ModelSource::Downloaded(model_id);
        Ok(manager)
    }

    /// Use a model directory in Hugging Face layout
    ///
    /// The model file is `onnx/model.onnx`, falling back to `model.onnx` at
    /// the directory root.
    ///
    /// # Errors
    /// - The directory does not exist
    /// - No model file found
    /// - Missing or invalid `preprocessor_config.json`
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BgRemovalError::model(format!(
                "Model directory does not exist: {}",
                dir.display()
            )));
        }

        let model_file = [dir.join(ONNX_MODEL_FILE), dir.join("model.onnx")]
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                BgRemovalError::model(format!(
                    "No ONNX model found in {} (expected {} or model.onnx)",
                    dir.display(),
                    ONNX_MODEL_FILE
                ))
            })?;

        let config_path = dir.join(PREPROCESSOR_CONFIG_FILE);
        if !config_path.is_file() {
            return Err(BgRemovalError::model(format!(
                "Missing {} in {}",
                PREPROCESSOR_CONFIG_FILE,
                dir.display()
            )));
        }
        let preprocessing = PreprocessingConfig::from_file(&config_path)?;

        Ok(Self {
            source: ModelSource::External(dir.to_path_buf()),
            model_file,
            preprocessing,
        })
    }

    /// Load model data
    ///
    /// # Errors
    /// - File I/O errors when reading model data
    pub fn load_model(&self) -> Result<Vec<u8>> {
        fs::read(&self.model_file)
            .map_err(|e| BgRemovalError::file_io_error("read model file", &self.model_file, &e))
    }

    /// Get preprocessing configuration
    #[must_use]
    pub fn preprocessing_config(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    /// Path of the ONNX model file
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_file
    }

    #[must_use]
    pub fn source(&self) -> &ModelSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ISNET_PREPROCESSOR: &str = r#"{
        "do_normalize": true,
        "do_rescale": false,
        "image_mean": [128, 128, 128],
        "image_std": [256, 256, 256],
        "size": {"height": 1024, "width": 1024}
    }"#;

    fn write_model_dir(root: &Path, model_rel: &str) {
        let model_path = root.join(model_rel);
        fs::create_dir_all(model_path.parent().unwrap()).unwrap();
        fs::write(model_path, b"fake onnx").unwrap();
        fs::write(root.join(PREPROCESSOR_CONFIG_FILE), ISNET_PREPROCESSOR).unwrap();
    }

    #[test]
    fn test_default_preprocessing_matches_isnet() {
        let parsed: HuggingFacePreprocessor = serde_json::from_str(ISNET_PREPROCESSOR).unwrap();
        let config = PreprocessingConfig::try_from(parsed).unwrap();
        assert_eq!(config, PreprocessingConfig::default());
    }

    #[test]
    fn test_preprocessor_rejects_short_mean() {
        let parsed: HuggingFacePreprocessor = serde_json::from_str(
            r#"{"image_mean": [0.5], "image_std": [1, 1, 1], "size": {"height": 8, "width": 8}}"#,
        )
        .unwrap();
        let err = PreprocessingConfig::try_from(parsed).unwrap_err();
        assert!(err.to_string().contains("image_mean"));
    }

    #[test]
    fn test_preprocessor_rejects_zero_std() {
        let parsed: HuggingFacePreprocessor = serde_json::from_str(
            r#"{"image_mean": [0, 0, 0], "image_std": [1, 0, 1], "size": {"height": 8, "width": 8}}"#,
        )
        .unwrap();
        assert!(PreprocessingConfig::try_from(parsed).is_err());
    }

    #[test]
    fn test_from_dir_huggingface_layout() {
        let temp_dir = TempDir::new().unwrap();
        write_model_dir(temp_dir.path(), ONNX_MODEL_FILE);

        let manager = ModelManager::from_dir(temp_dir.path()).unwrap();

        assert_eq!(manager.model_path(), temp_dir.path().join(ONNX_MODEL_FILE));
        assert_eq!(manager.load_model().unwrap(), b"fake onnx");
        assert_eq!(manager.preprocessing_config().target_size, [1024, 1024]);
        assert!(matches!(manager.source(), ModelSource::External(_)));
    }

    #[test]
    fn test_from_dir_flat_layout() {
        let temp_dir = TempDir::new().unwrap();
        write_model_dir(temp_dir.path(), "model.onnx");

        let manager = ModelManager::from_dir(temp_dir.path()).unwrap();
        assert_eq!(manager.model_path(), temp_dir.path().join("model.onnx"));
    }

    #[test]
    fn test_from_dir_missing_pieces() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ModelManager::from_dir(temp_dir.path().join("nope")).is_err());

        // No model file
        fs::write(temp_dir.path().join(PREPROCESSOR_CONFIG_FILE), ISNET_PREPROCESSOR).unwrap();
        let err = ModelManager::from_dir(temp_dir.path()).unwrap_err();
        assert!(matches!(err, BgRemovalError::Model(_)));

        // Model file but no preprocessor config
        let other = TempDir::new().unwrap();
        fs::write(other.path().join("model.onnx"), b"x").unwrap();
        let err = ModelManager::from_dir(other.path()).unwrap_err();
        assert!(err.to_string().contains(PREPROCESSOR_CONFIG_FILE));
    }

    #[test]
    fn test_resolve_offline_missing_model() {
        let temp_dir = TempDir::new().unwrap();
        let config = RemovalConfig::builder()
            .cache_dir(temp_dir.path())
            .auto_download(false)
            .build()
            .unwrap();

        let err = ModelManager::resolve(&config).unwrap_err();
        match err {
            BgRemovalError::Model(msg) => assert!(msg.contains("imgly--isnet-general-onnx")),
            other => panic!("expected Model error, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_uses_cached_model() {
        let temp_dir = TempDir::new().unwrap();
        let model_dir = temp_dir.path().join("models").join("imgly--isnet-general-onnx");
        write_model_dir(&model_dir, ONNX_MODEL_FILE);

        let config = RemovalConfig::builder()
            .cache_dir(temp_dir.path())
            .auto_download(false)
            .build()
            .unwrap();

        let manager = ModelManager::resolve(&config).unwrap();
        assert_eq!(
            manager.source(),
            &ModelSource::Downloaded("imgly--isnet-general-onnx".to_string())
        );
        assert_eq!(manager.source().display_name(), "cached:imgly--isnet-general-onnx");
    }

    #[test]
    fn test_resolve_prefers_model_dir() {
        let temp_dir = TempDir::new().unwrap();
        write_model_dir(temp_dir.path(), ONNX_MODEL_FILE);

        let config = RemovalConfig::builder()
            .model_dir(temp_dir.path())
            .auto_download(false)
            .build()
            .unwrap();

        let manager = ModelManager::resolve(&config).unwrap();
        assert!(matches!(manager.source(), ModelSource::External(_)));
    }
}
