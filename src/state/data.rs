//! Shared data structures for media state
//!
//! These structs flow between the media stores, the save pipeline
//! and whatever UI layer embeds the crate.

use std::fmt;
use std::path::Path;

/// MIME type of everything the pipeline writes
pub const MIME_JPEG: &str = "image/jpeg";

/// Opaque reference to a stored media entry, issued by a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Locator {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A photo as listed by a store
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    /// Store-assigned id
    pub id: String,
    /// Where the bytes live
    pub locator: Locator,
    /// Filename shown to the user (e.g., "LUMIFY_EDIT_20240101_120000.jpg")
    pub display_name: String,
}

/// Request to create a new entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub display_name: String,
    pub mime_type: String,
    /// Album path relative to the store root (e.g., "Pictures/Lumify")
    pub relative_path: String,
    /// Staged entries stay hidden from listings until published
    pub pending: bool,
}

impl NewEntry {
    /// A hidden JPEG entry, to be published once fully written
    pub fn staged_jpeg(display_name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: MIME_JPEG.to_string(),
            relative_path: relative_path.into(),
            pending: true,
        }
    }
}

/// Name and album of an existing entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMeta {
    pub display_name: String,
    pub relative_path: String,
}

/// Pick a name that `taken` doesn't reject, appending " (n)" before the extension.
pub fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = format!("{} ({}){}", stem, n, extension);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
