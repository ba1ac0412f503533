//! The media store contract
//!
//! The filter engine never owns media entries; it reads one locator and
//! writes a new or updated one through this trait. Implementations must be
//! shareable across threads because pipeline steps run on blocking workers.

use std::io::{Read, Write};

use super::data::{EntryMeta, Locator, MediaRecord, NewEntry};
use super::edit::EditRecord;
use crate::error::StoreResult;

pub trait MediaStore: Send + Sync {
    /// All published photos, newest first
    fn list_photos(&self) -> StoreResult<Vec<MediaRecord>>;

    /// One entry by locator (published or pending)
    fn record(&self, locator: &Locator) -> StoreResult<MediaRecord>;

    /// Readable byte stream of an entry
    fn open_read(&self, locator: &Locator) -> StoreResult<Box<dyn Read + Send>>;

    /// Create an entry; `entry.pending` decides whether it starts hidden
    fn insert(&self, entry: &NewEntry) -> StoreResult<Locator>;

    /// Hide (`true`) or publish (`false`) an entry
    fn set_pending(&self, locator: &Locator, pending: bool) -> StoreResult<()>;

    /// Truncating writer for an existing entry
    fn open_write(&self, locator: &Locator) -> StoreResult<Box<dyn Write + Send>>;

    fn delete(&self, locator: &Locator) -> StoreResult<()>;

    /// Display name and album of an entry
    fn query_meta(&self, locator: &Locator) -> StoreResult<EntryMeta>;

    /// Remember that a filter was applied to an entry
    fn mark_edited(&self, locator: &Locator, edit: &EditRecord) -> StoreResult<()>;

    /// Published photos that carry at least one edit record, newest first
    fn edited_photos(&self) -> StoreResult<Vec<MediaRecord>>;
}

/// Read an entry fully into memory
pub fn read_all(store: &dyn MediaStore, locator: &Locator) -> StoreResult<Vec<u8>> {
    let mut reader = store.open_read(locator)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Replace an entry's bytes; the writer is flushed before returning
pub fn write_all(store: &dyn MediaStore, locator: &Locator, bytes: &[u8]) -> StoreResult<()> {
    let mut writer = store.open_write(locator)?;
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
