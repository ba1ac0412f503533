//! JPEG encoding of filtered buffers

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::SaveError;
use crate::render::PixelBuffer;

/// Compress to JPEG at `quality`. JPEG has no alpha channel, so alpha is dropped.
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<Vec<u8>, SaveError> {
    let rgb = DynamicImage::ImageRgba8(buffer.as_rgba().clone()).into_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| SaveError::WriteFailed(format!("jpeg compression: {}", e)))?;
    Ok(bytes)
}
