//! Pixel transform engine
//!
//! Applies a `ColorTransform` to every pixel of a buffer. The source is only
//! read; the result always lands in a freshly allocated buffer, so cached or
//! shared decodes are never modified.

use image::RgbaImage;
use tracing::debug;

use super::PixelBuffer;
use crate::color::ColorTransform;
use crate::error::{RenderError, RenderResult};

/// Apply `transform` to `source`, producing a new buffer of the same size.
///
/// Fails with `InvalidImage` for zero-dimension buffers and with
/// `TransformFailed` if the transform holds non-finite coefficients.
pub fn apply(source: &PixelBuffer, transform: &ColorTransform) -> RenderResult<PixelBuffer> {
    let (width, height) = source.dimensions();
    if source.is_empty() {
        return Err(RenderError::InvalidImage { width, height });
    }
    if !transform.is_finite() {
        return Err(RenderError::TransformFailed(
            "transform has non-finite coefficients".to_string(),
        ));
    }

    if transform.is_identity() {
        debug!(width, height, "identity transform, copying pixels");
        return Ok(source.clone());
    }

    let mut data = Vec::with_capacity(source.as_raw().len());
    for chunk in source.as_raw().chunks_exact(4) {
        let out = transform.apply_to_pixel([chunk[0], chunk[1], chunk[2], chunk[3]]);
        data.extend_from_slice(&out);
    }

    let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        RenderError::TransformFailed(format!("output size mismatch for {}x{}", width, height))
    })?;

    debug!(width, height, "applied color transform");
    Ok(PixelBuffer::from_rgba(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::builder::{brightness, saturation};
    use crate::color::ALPHA_ROW;

    fn gradient() -> PixelBuffer {
        let mut data = Vec::new();
        for i in 0..12u8 {
            data.extend_from_slice(&[i * 20, 255 - i * 20, i * 7, 100 + i]);
        }
        PixelBuffer::from_raw(4, 3, data).unwrap()
    }

    #[test]
    fn test_output_matches_per_pixel_transform() {
        let source = gradient();
        let t = saturation(0.3);
        let out = apply(&source, &t).unwrap();

        assert_eq!(out.dimensions(), source.dimensions());
        for y in 0..3 {
            for x in 0..4 {
                let p = source.pixel(x, y).unwrap();
                assert_eq!(out.pixel(x, y).unwrap(), t.apply_to_pixel(p));
            }
        }
    }

    #[test]
    fn test_source_is_untouched() {
        let source = gradient();
        let snapshot = source.clone();
        let _ = apply(&source, &brightness(80.0)).unwrap();
        assert_eq!(source, snapshot);
    }

    #[test]
    fn test_identity_is_noop() {
        let source = gradient();
        assert_eq!(apply(&source, &ColorTransform::identity()).unwrap(), source);
    }

    #[test]
    fn test_empty_buffer_is_invalid() {
        let empty = PixelBuffer::from_raw(0, 5, Vec::new()).unwrap();
        assert_eq!(
            apply(&empty, &brightness(1.0)).unwrap_err(),
            RenderError::InvalidImage { width: 0, height: 5 }
        );
    }

    #[test]
    fn test_non_finite_transform_fails() {
        let t = ColorTransform::from_rows([
            [f32::INFINITY, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            ALPHA_ROW,
        ]);
        assert!(matches!(
            apply(&gradient(), &t),
            Err(RenderError::TransformFailed(_))
        ));
    }

    #[test]
    fn test_alpha_passes_through() {
        let source = gradient();
        let out = apply(&source, &brightness(-255.0)).unwrap();
        for (a, b) in source.as_raw().chunks_exact(4).zip(out.as_raw().chunks_exact(4)) {
            assert_eq!(a[3], b[3]);
            assert_eq!(&b[..3], &[0, 0, 0]);
        }
    }
}
