//! Backend implementations for different inference engines
//!
//! - Tract backend (pure Rust, no external dependencies, default)
//! - ONNX Runtime backend (native runtime, feature `onnx`)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

// Re-export backends based on enabled features
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

pub use crate::config::BackendType;

use crate::{
    config::RemovalConfig,
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
};

/// Create an uninitialized backend of the requested type
///
/// # Errors
/// - The backend was not compiled into this build
pub fn create_backend(
    backend_type: BackendType,
    config: &RemovalConfig,
) -> Result<Box<dyn InferenceBackend>> {
    match backend_type {
        #[cfg(feature = "tract")]
        BackendType::Tract => {
            let _ = config;
            Ok(Box::new(TractBackend::new()))
        },
        #[cfg(feature = "onnx")]
        BackendType::Onnx => Ok(Box::new(OnnxBackend::new(config.intra_threads))),
        #[allow(unreachable_patterns)]
        other => {
            let _ = config;
            Err(BgRemovalError::invalid_config(format!(
                "Backend '{other}' is not available in this build (enable the '{other}' feature)"
            )))
        },
    }
}
