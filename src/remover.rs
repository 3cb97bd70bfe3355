//! Background removal capability and its segmentation-model implementation

use crate::{
    backends::create_backend,
    config::RemovalConfig,
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    models::{ModelManager, PreprocessingConfig},
    services::ImageIOService,
    utils::{apply_alpha, mask_from_tensor, ImagePreprocessor},
};
use image::DynamicImage;
use instant::Instant;

/// Removes the background from an encoded image
///
/// Takes encoded image bytes in any supported format and returns PNG bytes
/// with the background made transparent.
pub trait BackgroundRemover {
    /// # Errors
    /// - The bytes are not a decodable image
    /// - Any model, inference or encoding failure
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>>;
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for Box<R> {
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).remove(image_bytes)
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for &mut R {
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).remove(image_bytes)
    }
}

/// Background remover backed by a segmentation model
///
/// The model is resolved and loaded on the first call to
/// [`BackgroundRemover::remove`], so constructing one is free and input
/// errors surface before any model I/O.
pub struct SegmentationRemover {
    config: RemovalConfig,
    backend: Option<Box<dyn InferenceBackend>>,
    preprocessing: Option<PreprocessingConfig>,
}

impl std::fmt::Debug for SegmentationRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationRemover")
            .field("config", &self.config)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("preprocessing", &self.preprocessing)
            .finish()
    }
}

impl SegmentationRemover {
    /// Create a remover that resolves its model lazily from `config`
    #[must_use]
    pub fn new(config: RemovalConfig) -> Self {
        Self {
            config,
            backend: None,
            preprocessing: None,
        }
    }

    /// Create a remover around an already initialized backend
    ///
    /// No model is resolved; `preprocessing` describes the backend's input.
    #[must_use]
    pub fn with_backend(
        config: RemovalConfig,
        backend: Box<dyn InferenceBackend>,
        preprocessing: PreprocessingConfig,
    ) -> Self {
        Self {
            config,
            backend: Some(backend),
            preprocessing: Some(preprocessing),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Resolve the model and initialize the backend if that has not happened yet
    fn ensure_ready(&mut self) -> Result<(&mut dyn InferenceBackend, PreprocessingConfig)> {
        let needs_init = !matches!(
            (&self.backend, &self.preprocessing),
            (Some(backend), Some(_)) if backend.is_initialized()
        );

        if needs_init {
            let model = ModelManager::resolve(&self.config)?;
            let mut backend = match self.backend.take() {
                Some(backend) => backend,
                None => create_backend(self.config.backend, &self.config)?,
            };

            let load_time = backend.initialize(&model)?;
            tracing::info!(
                backend = backend.name(),
                model = %model.source().display_name(),
                load_ms = load_time.as_millis() as u64,
                "Model loaded"
            );

            self.preprocessing = Some(model.preprocessing_config().clone());
            self.backend = Some(backend);
        }

        match (self.backend.as_deref_mut(), &self.preprocessing) {
            (Some(backend), Some(preprocessing)) => Ok((backend, preprocessing.clone())),
            _ => Err(BgRemovalError::model("Backend is not ready")),
        }
    }

    fn segment(&mut self, image: &DynamicImage) -> Result<Vec<u8>> {
        let (backend, preprocessing) = self.ensure_ready()?;

        let (tensor, letterbox) = ImagePreprocessor::preprocess_for_inference(image, &preprocessing)?;

        let inference_start = Instant::now();
        let prediction = {
            let _span = tracing::debug_span!("inference", backend = backend.name()).entered();
            backend.infer(&tensor)?
        };
        log::debug!(
            "Inference took {}ms",
            inference_start.elapsed().as_millis()
        );

        let mask = mask_from_tensor(&prediction, &letterbox)?;
        let cutout = apply_alpha(image, &mask)?;

        ImageIOService::encode_png(&DynamicImage::ImageRgba8(cutout))
    }
}

impl BackgroundRemover for SegmentationRemover {
    fn remove(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let start = Instant::now();
        let image = ImageIOService::load_from_bytes(image_bytes)?;
        log::debug!(
            "Decoded {}x{} image from {} bytes",
            image.width(),
            image.height(),
            image_bytes.len()
        );

        let png = self.segment(&image)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            output_bytes = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Background removed"
        );
        Ok(png)
    }
}
