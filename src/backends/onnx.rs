//! ONNX Runtime backend implementation for segmentation models
//!
//! Inputs and outputs are addressed positionally, so the backend does not
//! depend on the tensor names baked into a particular export.

use crate::error::{BgRemovalError, Result};
use crate::inference::InferenceBackend;
use crate::models::ModelManager;
use instant::{Duration, Instant};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

/// ONNX Runtime backend for running segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Option<Session>,
    intra_threads: usize,
}

impl OnnxBackend {
    /// Create a new uninitialized backend
    ///
    /// `intra_threads == 0` lets ONNX Runtime pick based on available cores.
    #[must_use]
    pub fn new(intra_threads: usize) -> Self {
        Self {
            session: None,
            intra_threads,
        }
    }

    fn effective_intra_threads(&self) -> usize {
        if self.intra_threads > 0 {
            self.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        }
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self, model_manager: &ModelManager) -> Result<Duration> {
        let model_load_start = Instant::now();
        let model_data = model_manager.load_model()?;
        let intra_threads = self.effective_intra_threads();

        log::info!(
            "Initializing ONNX Runtime backend with {} ({} intra-op threads)",
            model_manager.source().display_name(),
            intra_threads
        );

        let session = Session::builder()
            .map_err(|e| BgRemovalError::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| BgRemovalError::inference(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| BgRemovalError::inference(format!("Failed to set intra threads: {e}")))?
            .commit_from_memory(&model_data)
            .map_err(|e| BgRemovalError::model(format!("Failed to create session from model data: {e}")))?;

        self.session = Some(session);

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "ONNX Runtime backend initialized in {}ms",
            model_load_time.as_millis()
        );
        Ok(model_load_time)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BgRemovalError::inference("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("Running ONNX inference on {:?}", input.dim());

        let input_value = Value::from_array(input.clone())
            .map_err(|e| BgRemovalError::inference(format!("Failed to convert input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| BgRemovalError::inference(format!("ONNX inference failed: {e}")))?;

        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| BgRemovalError::inference("No output tensors found"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| BgRemovalError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| BgRemovalError::inference(format!("Failed to extract output tensor: {e}")))?;

        let output_shape = output_tensor.shape().to_vec();
        let output_data: Vec<f32> = output_tensor.iter().copied().collect();

        let output_array = match output_shape.as_slice() {
            &[n, c, h, w] => Array4::from_shape_vec((n, c, h, w), output_data).map_err(|e| {
                BgRemovalError::inference(format!("Failed to reshape output tensor: {e}"))
            })?,
            other => {
                return Err(BgRemovalError::inference(format!(
                    "Expected 4D output tensor, got {}D",
                    other.len()
                )))
            },
        };

        log::debug!(
            "ONNX inference completed in {}ms, output {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );

        Ok(output_array)
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}
