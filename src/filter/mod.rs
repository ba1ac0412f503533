//! Named filter presets
//!
//! A preset bundles a display name and description with a composed
//! `ColorTransform`. The built-in presets live in `catalog.rs`.

use crate::color::ColorTransform;

pub mod catalog;

pub use catalog::FilterCatalog;

/// A user-facing filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPreset {
    /// Stable unique id (e.g., "monochrome")
    pub id: String,
    /// Display name (e.g., "Silver")
    pub name: String,
    /// One-line description for the picker
    pub description: String,
    /// The composed transform
    pub transform: ColorTransform,
}

impl FilterPreset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        transform: ColorTransform,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            transform,
        }
    }

    /// Whether applying this preset changes nothing
    pub fn is_original(&self) -> bool {
        self.transform.is_identity()
    }
}
