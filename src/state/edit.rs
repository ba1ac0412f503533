//! Edit records for filtered photos
//!
//! Every successful filter save is recorded against the resulting photo.
//! Records are serialized to JSON and stored in the library's `edits` table.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::filter::FilterPreset;

/// Which filter was applied to a photo and how it was saved
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditRecord {
    /// Preset id (e.g., "vintage")
    pub filter_id: String,
    /// Preset display name at the time of the edit
    pub filter_name: String,
    /// True when saved as a new copy, false when the original was overwritten
    pub saved_as_copy: bool,
    /// Unix timestamp in milliseconds
    pub edited_at: i64,
}

impl EditRecord {
    /// Record an edit made now
    pub fn new(preset: &FilterPreset, saved_as_copy: bool) -> Self {
        Self {
            filter_id: preset.id.clone(),
            filter_name: preset.name.clone(),
            saved_as_copy,
            edited_at: Utc::now().timestamp_millis(),
        }
    }

    /// Convert to JSON string for database storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from database)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
