//! Inference backend abstraction

use crate::{error::Result, models::ModelManager};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for inference backends
pub trait InferenceBackend {
    /// Load the model resolved by `model` and prepare it for inference
    ///
    /// Returns the time spent loading the model.
    ///
    /// # Errors
    /// - Model loading or validation errors
    /// - Backend initialization failures
    fn initialize(&mut self, model: &ModelManager) -> Result<Duration>;

    /// Run inference on an NCHW input tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Output is not a 4D `f32` tensor
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn initialize(&mut self, model: &ModelManager) -> Result<Duration> {
        (**self).initialize(model)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        (**self).infer(input)
    }

    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
