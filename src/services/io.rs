//! Image I/O operations service
//!
//! Keeps file access and PNG encoding out of the adapter and the remover so
//! both can be exercised without touching the filesystem.

use crate::error::{BgRemovalError, Result};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Read the raw bytes of an image file
    ///
    /// # Arguments
    /// * `path` - Path to the image file
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - The file contents, not yet decoded
    /// * `Err(BgRemovalError::FileNotFound)` - The file does not exist
    /// * `Err(BgRemovalError::Io)` - Any other read failure
    ///
    /// # Examples
    /// ```rust,no_run
    /// use remove_bg::services::ImageIOService;
    ///
    /// let bytes = ImageIOService::read_bytes("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgRemovalError::FileNotFound(path_ref.to_path_buf()));
        }

        std::fs::read(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read input image", path_ref, &e))
    }

    /// Write encoded image bytes to a file, creating parent directories
    ///
    /// An existing file at `path` is overwritten.
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BgRemovalError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| BgRemovalError::file_io_error("write output image", path_ref, &e))
    }

    /// Decode an image from bytes
    ///
    /// The format is detected from the content, never from a file name or a
    /// declared media type.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| {
            let detected = detect_image_format(bytes).unwrap_or("unknown");
            BgRemovalError::processing_stage_error(
                "image decoding",
                &format!("Failed to decode image from bytes: {e}"),
                Some(&format!("format: {detected}, size: {} bytes", bytes.len())),
            )
        })
    }

    /// Encode an image as PNG
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| BgRemovalError::processing(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer)
    }
}

/// Detect image format from magic bytes
#[must_use]
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data
        .get(0..8)
        .is_some_and(|slice| slice == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.get(0..3).is_some_and(|slice| slice == [0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    // WebP: RIFF....WEBP
    if data.get(0..4).is_some_and(|slice| slice == b"RIFF")
        && data.get(8..12).is_some_and(|slice| slice == b"WEBP")
    {
        return Some("webp");
    }

    // TIFF, little and big endian
    if data
        .get(0..4)
        .is_some_and(|slice| slice == [0x49, 0x49, 0x2A, 0x00] || slice == [0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some("tiff");
    }

    // GIF8
    if data.get(0..4).is_some_and(|slice| slice == b"GIF8") {
        return Some("gif");
    }

    // BMP: 42 4D
    if data.get(0..2).is_some_and(|slice| slice == b"BM") {
        return Some("bmp");
    }

    None
}
