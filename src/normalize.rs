//! Turns downloaded bytes into the canonical saved form: RGB, fixed size, JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::constants::{CANONICAL_HEIGHT, CANONICAL_WIDTH, JPEG_QUALITY};
use crate::error::FetchError;

/// Output geometry and quality for saved images.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NormalizeOptions {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            width: CANONICAL_WIDTH,
            height: CANONICAL_HEIGHT,
            quality: JPEG_QUALITY,
        }
    }
}

/// Decodes any supported format, converts to RGB, resizes exactly and re-encodes as JPEG.
pub fn normalize_image(bytes: &[u8], options: &NormalizeOptions) -> Result<Vec<u8>, FetchError> {
    if bytes.len() < 4 {
        debug!("Image is too short ({} bytes)", bytes.len());
        return Err(FetchError::Decode("image is too short".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| FetchError::Decode(format!("failed to guess image format: {err}")))?;
    let image = reader.decode()?;

    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, options.width, options.height, FilterType::Lanczos3);

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, options.quality);
    DynamicImage::ImageRgb8(resized).write_with_encoder(encoder)?;
    Ok(output)
}

/// [`normalize_image`] on the blocking pool, decoding and resampling are CPU heavy.
pub async fn normalize_image_blocking(
    bytes: Vec<u8>,
    options: NormalizeOptions,
) -> Result<Vec<u8>, FetchError> {
    tokio::task::spawn_blocking(move || normalize_image(&bytes, &options))
        .await
        .map_err(|err| FetchError::Decode(format!("normalize task failed: {err}")))?
}
