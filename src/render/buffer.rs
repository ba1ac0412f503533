//! Decoded RGBA pixel buffers

use image::{DynamicImage, RgbaImage};

use crate::error::{RenderError, RenderResult};

/// A decoded bitmap with 8-bit RGBA pixels
///
/// Transforms never write into a buffer they read from; they produce a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Wrap an existing RGBA image
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Writable RGBA8 copy of any decoded image (grayscale, RGB, 16-bit, ...)
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    /// Build from raw RGBA bytes; `None` if the length doesn't match the dimensions
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::from_rgba)
    }

    /// Single-color buffer, handy for previews and tests
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, image::Rgba(pixel)),
        }
    }

    /// Decode an encoded image (JPEG, PNG, ...) fully into memory
    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RenderError::DecodeFailed(e.to_string()))?;
        Ok(Self::from_dynamic(&decoded))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Zero width or zero height
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// RGBA of the pixel at (x, y); `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.image.get_pixel(x, y).0)
        } else {
            None
        }
    }

    /// Raw interleaved RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }
}
