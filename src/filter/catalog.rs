//! Built-in filter catalog
//!
//! Presets are composed once on first use and shared for the process lifetime.
//! Insertion order is display order; the first preset is always "original".

use std::collections::HashSet;
use std::sync::OnceLock;

use super::FilterPreset;
use crate::color::builder::{brightness, contrast, identity, saturation, sepia, temperature, tint};
use crate::color::compose;
use crate::error::CatalogError;

/// Ordered, immutable set of presets with unique ids
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    presets: Vec<FilterPreset>,
}

impl FilterCatalog {
    /// Build a catalog, checking that ids are unique and the first preset is a no-op
    pub fn new(presets: Vec<FilterPreset>) -> Result<Self, CatalogError> {
        let first = presets.first().ok_or(CatalogError::Empty)?;
        if !first.is_original() {
            return Err(CatalogError::FirstNotIdentity(first.id.clone()));
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            if !seen.insert(preset.id.as_str()) {
                return Err(CatalogError::DuplicateId(preset.id.clone()));
            }
        }

        Ok(Self { presets })
    }

    /// The shared built-in catalog
    pub fn builtin() -> &'static FilterCatalog {
        static CATALOG: OnceLock<FilterCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let checked = Self::new(builtin_presets());
            debug_assert!(checked.is_ok(), "built-in catalog rejected: {:?}", checked.as_ref().err());
            checked.unwrap_or_else(|_| Self {
                presets: builtin_presets(),
            })
        })
    }

    /// Look up a preset by id
    pub fn get(&self, id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// The identity preset (always first)
    pub fn original(&self) -> &FilterPreset {
        &self.presets[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl<'a> IntoIterator for &'a FilterCatalog {
    type Item = &'a FilterPreset;
    type IntoIter = std::slice::Iter<'a, FilterPreset>;

    fn into_iter(self) -> Self::IntoIter {
        self.presets.iter()
    }
}

fn builtin_presets() -> Vec<FilterPreset> {
    vec![
        FilterPreset::new("original", "Original", "No filter applied", identity()),
        FilterPreset::new(
            "monochrome",
            "Silver",
            "Classic high-contrast black & white",
            compose(&[saturation(0.0), contrast(1.2)]),
        ),
        FilterPreset::new(
            "vintage",
            "Nostalgia",
            "Warm tones with vintage film character",
            compose(&[temperature(0.3), saturation(0.85), sepia(0.2), contrast(1.1)]),
        ),
        FilterPreset::new(
            "cool",
            "Nordic",
            "Clean, cool tones with crisp detail",
            compose(&[temperature(-0.3), contrast(1.15), saturation(0.9)]),
        ),
        FilterPreset::new(
            "warm",
            "Golden",
            "Rich, warm tones with enhanced depth",
            compose(&[temperature(0.4), saturation(1.05), tint(1.1, 0.95, 0.8, 0.3)]),
        ),
        FilterPreset::new(
            "high_contrast",
            "Impact",
            "Bold contrast with vibrant colors",
            compose(&[contrast(1.4), saturation(1.15), brightness(-10.0)]),
        ),
        FilterPreset::new(
            "muted",
            "Cinema",
            "Subtle, filmic tones with reduced contrast",
            compose(&[saturation(0.8), contrast(0.9), tint(0.95, 0.95, 1.05, 0.2)]),
        ),
        FilterPreset::new(
            "dramatic",
            "Street",
            "Dramatic black & white with deep shadows",
            compose(&[saturation(0.0), contrast(1.5), brightness(-20.0)]),
        ),
        FilterPreset::new(
            "vibrant",
            "Pop",
            "Bright, vibrant colors with extra punch",
            compose(&[saturation(1.3), contrast(1.2), brightness(10.0)]),
        ),
        FilterPreset::new(
            "pastel",
            "Dreamy",
            "Soft pastel colors with lifted shadows",
            compose(&[
                saturation(0.9),
                contrast(0.85),
                brightness(25.0),
                tint(1.05, 1.05, 1.1, 0.2),
            ]),
        ),
        FilterPreset::new(
            "cross_process",
            "Analog",
            "Creative color shift with cross-processed look",
            compose(&[tint(1.0, 1.2, 0.8, 0.3), contrast(1.2), saturation(1.1)]),
        ),
        FilterPreset::new(
            "verde",
            "Verde",
            "Lush greens with teal shadows",
            compose(&[tint(0.9, 1.1, 1.0, 0.2), saturation(1.1), contrast(1.1)]),
        ),
        FilterPreset::new(
            "portrait",
            "Portrait",
            "Flattering skin tones with soft detail",
            compose(&[
                saturation(0.95),
                contrast(0.95),
                temperature(0.15),
                tint(1.05, 0.98, 0.95, 0.15),
            ]),
        ),
        FilterPreset::new(
            "airy",
            "Airy",
            "Bright, airy look with minimal contrast",
            compose(&[brightness(30.0), contrast(0.8), saturation(0.85)]),
        ),
    ]
}
