//! Image tensor utilities shared by the removal pipeline

pub mod mask;
pub mod preprocessing;

pub use mask::{apply_alpha, mask_from_tensor};
pub use preprocessing::{ImagePreprocessor, Letterbox, PreprocessingOptions};
