//! Preset previews for the filter picker
//!
//! The source is downsized once and every preset of the catalog is applied
//! to the small copy.

use image::{imageops::FilterType, DynamicImage};

use super::{engine, PixelBuffer};
use crate::error::RenderResult;
use crate::filter::FilterCatalog;

/// Default longest edge of a preset preview
pub const PREVIEW_SIZE: u32 = 256;

/// One rendered preview
#[derive(Debug, Clone)]
pub struct PresetPreview {
    pub preset_id: String,
    pub buffer: PixelBuffer,
}

/// Downsize to fit in a `max_edge` square, keeping the aspect ratio.
/// Buffers already small enough are copied as-is.
pub fn downsize(source: &PixelBuffer, max_edge: u32) -> PixelBuffer {
    let (width, height) = source.dimensions();
    if width <= max_edge && height <= max_edge {
        return source.clone();
    }

    let resized = DynamicImage::ImageRgba8(source.as_rgba().clone()).resize(
        max_edge,
        max_edge,
        FilterType::Lanczos3,
    );
    PixelBuffer::from_dynamic(&resized)
}

/// Render every preset of `catalog` onto a downsized copy of `source`,
/// in catalog order.
pub fn preset_previews(
    source: &PixelBuffer,
    catalog: &FilterCatalog,
    max_edge: u32,
) -> RenderResult<Vec<PresetPreview>> {
    let thumbnail = downsize(source, max_edge.max(1));

    catalog
        .iter()
        .map(|preset| {
            Ok(PresetPreview {
                preset_id: preset.id.clone(),
                buffer: engine::apply(&thumbnail, &preset.transform)?,
            })
        })
        .collect()
}
