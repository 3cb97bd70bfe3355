//! `data:` URI encoding and decoding
//!
//! Only the base64 form is supported. The header before the first comma is
//! informational: the payload is decoded regardless of the declared media
//! type, and the image format is later detected from the decoded content.

use crate::error::{BgRemovalError, Result};
use base64::{engine::general_purpose, Engine as _};

/// Prefix of every data URI produced by this crate
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Returns `true` for strings that look like an image data URI
#[must_use]
pub fn is_image_data_uri(value: &str) -> bool {
    value.starts_with("data:image")
}

/// Declared media type of a data URI, e.g. `image/jpeg`
#[must_use]
pub fn media_type(uri: &str) -> Option<&str> {
    let header = uri.strip_prefix("data:")?.split(',').next()?;
    let media_type = header.split(';').next()?;
    (!media_type.is_empty()).then_some(media_type)
}

/// Decode the payload of a base64 data URI into raw bytes
///
/// Everything up to the first comma is treated as the header. ASCII
/// whitespace inside the payload (line-wrapped input) is ignored.
///
/// # Errors
/// - [`BgRemovalError::MalformedDataUri`] when there is no comma or the
///   payload is not valid base64
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (_header, payload) = uri
        .split_once(',')
        .ok_or_else(|| BgRemovalError::malformed_data_uri("missing ',' separator"))?;

    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    general_purpose::STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| BgRemovalError::malformed_data_uri(format!("invalid base64 payload: {e}")))
}

/// Encode PNG bytes as `data:image/png;base64,<payload>`
#[must_use]
pub fn encode_png_data_uri(png_bytes: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(png_bytes);
    let mut uri = String::with_capacity(PNG_DATA_URI_PREFIX.len() + encoded.len());
    uri.push_str(PNG_DATA_URI_PREFIX);
    uri.push_str(&encoded);
    uri
}
