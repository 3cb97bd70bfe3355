//! Letterbox preprocessing for segmentation models
//!
//! The image is scaled to fit the model input while keeping its aspect
//! ratio, centred on a padded canvas and converted to a normalized NCHW
//! tensor. The returned [`Letterbox`] records where the image landed so the
//! predicted mask can be mapped back onto the original pixels.

use crate::{
    error::{BgRemovalError, Result},
    models::PreprocessingConfig,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255], // White padding
        }
    }
}

/// Placement of the resized image inside the model input canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale applied to the original image
    pub scale: f32,
    /// Horizontal offset of the resized image on the canvas
    pub offset_x: u32,
    /// Vertical offset of the resized image on the canvas
    pub offset_y: u32,
    /// Width of the resized image
    pub resized_width: u32,
    /// Height of the resized image
    pub resized_height: u32,
    /// Canvas width (model input width)
    pub canvas_width: u32,
    /// Canvas height (model input height)
    pub canvas_height: u32,
    /// Width of the original image
    pub original_width: u32,
    /// Height of the original image
    pub original_height: u32,
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess image for model inference
    ///
    /// This function handles:
    /// - RGB conversion
    /// - Aspect ratio preserving resize
    /// - Center padding to target size
    /// - Normalization to tensor format (NCHW)
    ///
    /// # Errors
    /// - The image has a zero dimension
    /// - The configured target size is zero
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<(Array4<f32>, Letterbox)> {
        let [target_height, target_width] = preprocessing_config.target_size;
        if target_width == 0 || target_height == 0 {
            return Err(BgRemovalError::processing(
                "Model target size must be non-zero",
            ));
        }

        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(BgRemovalError::processing_stage_error(
                "preprocessing",
                "image has a zero dimension",
                Some(&format!("{orig_width}x{orig_height}")),
            ));
        }

        let scale = (target_width as f32 / orig_width as f32)
            .min(target_height as f32 / orig_height as f32);

        // Degenerate strips still keep at least one pixel
        let new_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_width);
        let new_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_height);

        let resized = image::imageops::resize(
            &rgb_image,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );

        let padding = options.padding_color;
        let mut canvas = ImageBuffer::from_pixel(
            target_width,
            target_height,
            image::Rgb([padding[0], padding[1], padding[2]]),
        );

        let offset_x = (target_width - new_width) / 2;
        let offset_y = (target_height - new_height) / 2;
        image::imageops::replace(&mut canvas, &resized, i64::from(offset_x), i64::from(offset_y));

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config);

        let letterbox = Letterbox {
            scale,
            offset_x,
            offset_y,
            resized_width: new_width,
            resized_height: new_height,
            canvas_width: target_width,
            canvas_height: target_height,
            original_width: orig_width,
            original_height: orig_height,
        };

        Ok((tensor, letterbox))
    }

    /// Preprocess with the default white padding
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, Letterbox)> {
        Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())
    }

    /// Convert canvas to normalized tensor
    #[allow(clippy::indexing_slicing)]
    // Safe: channel is always in 0..3
    fn canvas_to_tensor(canvas: &RgbImage, preprocessing_config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        Array4::from_shape_fn(
            (1, 3, height as usize, width as usize),
            |(_, channel, y, x)| {
                let pixel = canvas.get_pixel(x as u32, y as u32);
                (f32::from(pixel[channel]) / 255.0 - mean[channel]) / std[channel]
            },
        )
    }
}
