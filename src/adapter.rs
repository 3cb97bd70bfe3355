//! Image conversion adapter
//!
//! Normalizes file paths, data URIs and raw bytes into an encoded byte
//! buffer, hands it to a [`BackgroundRemover`] and turns the result into
//! either a written file or a PNG data URI.

use crate::{
    data_uri,
    error::Result,
    remover::BackgroundRemover,
    services::ImageIOService,
    types::{ImageInput, ImageOutput},
};
use std::path::{Path, PathBuf};

/// Converts between input representations around a background remover
#[derive(Debug)]
pub struct ImageConversionAdapter<R: BackgroundRemover> {
    remover: R,
}

impl<R: BackgroundRemover> ImageConversionAdapter<R> {
    #[must_use]
    pub fn new(remover: R) -> Self {
        Self { remover }
    }

    /// Remove the background of `input`
    ///
    /// With an `output_path` the PNG is written there (parent directories
    /// are created, an existing file is replaced) and
    /// [`ImageOutput::FileWritten`] is returned. Without one the PNG comes
    /// back as a `data:image/png;base64,` URI.
    ///
    /// # Errors
    /// - [`BgRemovalError::MalformedDataUri`](crate::BgRemovalError::MalformedDataUri)
    ///   for a data URI without a comma or with invalid base64
    /// - [`BgRemovalError::FileNotFound`](crate::BgRemovalError::FileNotFound)
    ///   when the input file does not exist
    /// - [`BgRemovalError::Io`](crate::BgRemovalError::Io) on other read or
    ///   write failures
    /// - [`BgRemovalError::Processing`](crate::BgRemovalError::Processing)
    ///   for any failure inside the remover
    pub fn remove_background(
        &mut self,
        input: &ImageInput,
        output_path: Option<&Path>,
    ) -> Result<ImageOutput> {
        let _span = tracing::info_span!("conversion", input = %input.describe()).entered();

        let owned;
        let image_bytes: &[u8] = match input {
            ImageInput::DataUri(uri) => {
                owned = data_uri::decode_data_uri(uri)?;
                &owned
            },
            ImageInput::FilePath(path) => {
                owned = ImageIOService::read_bytes(path)?;
                &owned
            },
            ImageInput::Bytes(bytes) => bytes,
        };
        tracing::debug!(bytes = image_bytes.len(), "Input normalized");

        let output_bytes = self
            .remover
            .remove(image_bytes)
            .map_err(crate::BgRemovalError::into_processing)?;

        match output_path {
            Some(path) => {
                ImageIOService::write_bytes(path, &output_bytes)?;
                tracing::info!(path = %path.display(), bytes = output_bytes.len(), "Output written");
                Ok(ImageOutput::FileWritten(path.to_path_buf()))
            },
            None => Ok(ImageOutput::DataUri(data_uri::encode_png_data_uri(&output_bytes))),
        }
    }

    /// Like [`remove_background`](Self::remove_background), but failures are
    /// reported on stderr and turned into `None`
    pub fn convert(&mut self, input: &ImageInput, output_path: Option<&Path>) -> Option<ImageOutput> {
        match self.remove_background(input, output_path) {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::debug!(error = %e, input = %input.describe(), "Conversion failed");
                eprintln!("Error processing image: {e}");
                None
            },
        }
    }

    /// Give back the wrapped remover
    pub fn into_inner(self) -> R {
        self.remover
    }
}

/// Default output location for a file input: `<stem>_no_bg.png` next to it
///
/// # Examples
/// ```rust
/// use remove_bg::default_output_path;
/// use std::path::Path;
///
/// assert_eq!(
///     default_output_path(Path::new("photos/cat.jpg")),
///     Path::new("photos/cat_no_bg.png")
/// );
/// ```
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}_no_bg.png"))
}
