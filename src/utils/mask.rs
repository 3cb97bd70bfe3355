//! Segmentation mask post-processing

use crate::{
    error::{BgRemovalError, Result},
    utils::preprocessing::Letterbox,
};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use ndarray::{s, Array4};

/// Predictions with a spread below this are treated as constant
const FLAT_RANGE_EPSILON: f32 = 1e-6;

/// Turn a raw `1×C×H×W` model prediction into an 8-bit alpha matte
///
/// The prediction is min-max normalized to 0..1, the letterboxed region is
/// cropped out and the result is resized to the original image dimensions.
/// A flat prediction is clamped to 0..1 instead of normalized, so an
/// all-foreground output stays fully opaque.
///
/// # Errors
/// - The tensor is not `1×C×H×W` with at least one channel
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn mask_from_tensor(prediction: &Array4<f32>, letterbox: &Letterbox) -> Result<GrayImage> {
    let (batch, channels, height, width) = prediction.dim();
    if batch != 1 || channels == 0 || height == 0 || width == 0 {
        return Err(BgRemovalError::processing_stage_error(
            "mask generation",
            "unexpected model output shape",
            Some(&format!("{:?}", prediction.shape())),
        ));
    }

    let plane = prediction.slice(s![0, 0, .., ..]);

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let normalize = |value: f32| -> f32 {
        if range > FLAT_RANGE_EPSILON {
            (value - min) / range
        } else {
            value.clamp(0.0, 1.0)
        }
    };

    // The model output may not share the input resolution
    let sx = width as f32 / letterbox.canvas_width as f32;
    let sy = height as f32 / letterbox.canvas_height as f32;

    let crop_x = ((letterbox.offset_x as f32 * sx).round() as usize).min(width - 1);
    let crop_y = ((letterbox.offset_y as f32 * sy).round() as usize).min(height - 1);
    let crop_w = ((letterbox.resized_width as f32 * sx).round() as usize)
        .clamp(1, width - crop_x);
    let crop_h = ((letterbox.resized_height as f32 * sy).round() as usize)
        .clamp(1, height - crop_y);

    let cropped = GrayImage::from_fn(crop_w as u32, crop_h as u32, |x, y| {
        let value = plane
            .get((crop_y + y as usize, crop_x + x as usize))
            .copied()
            .unwrap_or(0.0);
        Luma([(normalize(value) * 255.0).round().clamp(0.0, 255.0) as u8])
    });

    if cropped.dimensions() == (letterbox.original_width, letterbox.original_height) {
        return Ok(cropped);
    }

    Ok(image::imageops::resize(
        &cropped,
        letterbox.original_width,
        letterbox.original_height,
        image::imageops::FilterType::Triangle,
    ))
}

/// Apply an alpha matte to an image
///
/// Pixels with zero alpha are cleared to transparent black.
///
/// # Errors
/// - The matte does not match the image dimensions
pub fn apply_alpha(image: &DynamicImage, mask: &GrayImage) -> Result<RgbaImage> {
    let mut rgba = image.to_rgba8();
    if rgba.dimensions() != mask.dimensions() {
        return Err(BgRemovalError::processing_stage_error(
            "alpha compositing",
            "mask dimensions do not match the image",
            Some(&format!(
                "image {:?}, mask {:?}",
                rgba.dimensions(),
                mask.dimensions()
            )),
        ));
    }

    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        let [r, g, b, _] = pixel.0;
        let a = alpha.0[0];
        pixel.0 = if a == 0 { [0, 0, 0, 0] } else { [r, g, b, a] };
    }

    Ok(rgba)
}
