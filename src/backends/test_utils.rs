//! Mock inference backend for testing the removal pipeline
//!
//! Produces deterministic masks without model files, ONNX Runtime or Tract.

use crate::{
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    models::ModelManager,
};
use instant::Duration;
use ndarray::Array4;
use std::sync::{Arc, Mutex};

/// Shape of the mask the mock predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMask {
    /// Everything is foreground
    Foreground,
    /// Soft-edged disc centred on the input
    Circle,
}

/// Mock backend for testing
#[derive(Debug, Clone)]
pub struct MockBackend {
    initialized: bool,
    mask: MockMask,
    should_fail_inference: bool,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    /// Create an initialized mock backend
    #[must_use]
    pub fn new(mask: MockMask) -> Self {
        Self {
            initialized: true,
            mask,
            should_fail_inference: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock backend that still needs `initialize`
    #[must_use]
    pub fn new_uninitialized(mask: MockMask) -> Self {
        let mut backend = Self::new(mask);
        backend.initialized = false;
        backend
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn new_failing_inference() -> Self {
        let mut backend = Self::new(MockMask::Foreground);
        backend.should_fail_inference = true;
        backend
    }

    /// Shared handle on the call history, valid after the backend is moved
    #[must_use]
    pub fn call_history(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn generate_mock_output(&self, input: &Array4<f32>) -> Array4<f32> {
        let (batch, _, height, width) = input.dim();
        match self.mask {
            MockMask::Foreground => Array4::ones((batch, 1, height, width)),
            MockMask::Circle => {
                let center_x = width as f32 / 2.0;
                let center_y = height as f32 / 2.0;
                let radius = (width.min(height) as f32 / 3.0).max(1.0);

                Array4::from_shape_fn((batch, 1, height, width), |(_, _, y, x)| {
                    let dx = x as f32 - center_x;
                    let dy = y as f32 - center_y;
                    let distance = (dx * dx + dy * dy).sqrt();
                    ((radius - distance) / radius).clamp(0.0, 1.0)
                })
            },
        }
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _model: &ModelManager) -> Result<Duration> {
        self.record_call("initialize");
        self.initialized = true;
        Ok(Duration::from_millis(1))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.record_call("infer");
        if !self.initialized {
            return Err(BgRemovalError::inference("Mock backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BgRemovalError::inference("Mock inference failure"));
        }
        Ok(self.generate_mock_output(input))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_output_follows_input_shape() {
        let mut backend = MockBackend::new(MockMask::Circle);
        let output = backend.infer(&Array4::zeros((1, 3, 12, 20))).unwrap();

        assert_eq!(output.shape(), &[1, 1, 12, 20]);
        assert!(output[[0, 0, 6, 10]] > 0.9);
        assert!(output[[0, 0, 0, 0]].abs() < f32::EPSILON);
    }

    #[test]
    fn test_mock_call_history() {
        let mut backend = MockBackend::new_failing_inference();
        let history = backend.call_history();

        assert!(backend.infer(&Array4::zeros((1, 3, 2, 2))).is_err());
        assert_eq!(*history.lock().unwrap(), vec!["infer".to_string()]);
    }
}
