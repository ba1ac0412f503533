//! In-memory media store
//!
//! Keeps entries in a map behind a mutex. A `FaultPlan` makes individual
//! operations fail the way a restrictive platform store would, and every
//! mutating operation is appended to an operation log.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use super::data::{unique_name, EntryMeta, Locator, MediaRecord, NewEntry, MIME_JPEG};
use super::edit::EditRecord;
use super::store::MediaStore;
use crate::error::{StoreError, StoreResult};

const LOCATOR_PREFIX: &str = "memory://images/";

/// Operations a store may be told to refuse
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultPlan {
    /// Refuse writers for published entries (staged ones stay writable)
    pub reject_overwrite: bool,
    /// Refuse every delete
    pub reject_delete: bool,
    /// Refuse every insert
    pub fail_insert: bool,
}

/// One entry of the operation log
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Insert(Locator),
    /// Bytes committed to an entry
    Write(Locator),
    Publish(Locator),
    Hide(Locator),
    Delete(Locator),
    OverwriteRejected(Locator),
    DeleteRejected(Locator),
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    display_name: String,
    relative_path: String,
    #[allow(dead_code)]
    mime_type: String,
    bytes: Vec<u8>,
    pending: bool,
    added: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    clock: u64,
    entries: BTreeMap<u64, MemoryEntry>,
    edits: Vec<(u64, EditRecord)>,
    faults: FaultPlan,
    log: Vec<StoreOp>,
}

/// Thread-safe in-memory `MediaStore`. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a published photo with the given bytes
    pub fn add_photo(&self, display_name: &str, bytes: Vec<u8>) -> StoreResult<Locator> {
        let mut state = lock(&self.state)?;
        let id = state.allocate(display_name, "Pictures", MIME_JPEG, false);
        if let Some(entry) = state.entries.get_mut(&id) {
            entry.bytes = bytes;
        }
        Ok(make_locator(id))
    }

    /// Replace the fault plan
    pub fn set_faults(&self, faults: FaultPlan) -> StoreResult<()> {
        lock(&self.state)?.faults = faults;
        Ok(())
    }

    /// Snapshot of the operation log
    pub fn log(&self) -> StoreResult<Vec<StoreOp>> {
        Ok(lock(&self.state)?.log.clone())
    }

    /// Stored bytes of an entry
    pub fn bytes(&self, locator: &Locator) -> StoreResult<Option<Vec<u8>>> {
        let id = parse_locator(locator)?;
        Ok(lock(&self.state)?.entries.get(&id).map(|e| e.bytes.clone()))
    }

    /// Whether an entry is still staged; `None` if it doesn't exist
    pub fn is_pending(&self, locator: &Locator) -> StoreResult<Option<bool>> {
        let id = parse_locator(locator)?;
        Ok(lock(&self.state)?.entries.get(&id).map(|e| e.pending))
    }

    /// Number of entries, pending ones included
    pub fn entry_count(&self) -> StoreResult<usize> {
        Ok(lock(&self.state)?.entries.len())
    }

    fn records_where(&self, keep: impl Fn(u64, &MemoryEntry) -> bool) -> StoreResult<Vec<MediaRecord>> {
        let state = lock(&self.state)?;
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .filter(|(id, e)| !e.pending && keep(**id, e))
            .collect();
        entries.sort_by(|a, b| b.1.added.cmp(&a.1.added));
        Ok(entries
            .into_iter()
            .map(|(id, e)| to_record(*id, e))
            .collect())
    }
}

impl MemoryState {
    fn allocate(&mut self, display_name: &str, relative_path: &str, mime_type: &str, pending: bool) -> u64 {
        self.next_id += 1;
        self.clock += 1;
        let id = self.next_id;

        let name = unique_name(display_name, |candidate| {
            self.entries
                .values()
                .any(|e| e.relative_path == relative_path && e.display_name == candidate)
        });
        self.entries.insert(
            id,
            MemoryEntry {
                display_name: name,
                relative_path: relative_path.to_string(),
                mime_type: mime_type.to_string(),
                bytes: Vec::new(),
                pending,
                added: self.clock,
            },
        );
        self.log.push(StoreOp::Insert(make_locator(id)));
        id
    }

    fn entry(&self, id: u64, locator: &Locator) -> StoreResult<&MemoryEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }
}

impl MediaStore for MemoryStore {
    fn list_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        self.records_where(|_, _| true)
    }

    fn record(&self, locator: &Locator) -> StoreResult<MediaRecord> {
        let id = parse_locator(locator)?;
        let state = lock(&self.state)?;
        let entry = state.entry(id, locator)?;
        Ok(to_record(id, entry))
    }

    fn open_read(&self, locator: &Locator) -> StoreResult<Box<dyn Read + Send>> {
        let id = parse_locator(locator)?;
        let state = lock(&self.state)?;
        let bytes = state.entry(id, locator)?.bytes.clone();
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn insert(&self, entry: &NewEntry) -> StoreResult<Locator> {
        let mut state = lock(&self.state)?;
        if state.faults.fail_insert {
            return Err(StoreError::PermissionDenied("insert refused".to_string()));
        }
        let id = state.allocate(
            &entry.display_name,
            &entry.relative_path,
            &entry.mime_type,
            entry.pending,
        );
        Ok(make_locator(id))
    }

    fn set_pending(&self, locator: &Locator, pending: bool) -> StoreResult<()> {
        let id = parse_locator(locator)?;
        let mut state = lock(&self.state)?;
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))?;
        entry.pending = pending;
        let op = if pending {
            StoreOp::Hide(locator.clone())
        } else {
            StoreOp::Publish(locator.clone())
        };
        state.log.push(op);
        Ok(())
    }

    fn open_write(&self, locator: &Locator) -> StoreResult<Box<dyn Write + Send>> {
        let id = parse_locator(locator)?;
        let mut state = lock(&self.state)?;
        let pending = state.entry(id, locator)?.pending;
        if state.faults.reject_overwrite && !pending {
            state.log.push(StoreOp::OverwriteRejected(locator.clone()));
            return Err(StoreError::PermissionDenied(locator.to_string()));
        }
        Ok(Box::new(MemoryWriter {
            state: Arc::clone(&self.state),
            id,
            locator: locator.clone(),
            buffer: Vec::new(),
            dirty: true,
        }))
    }

    fn delete(&self, locator: &Locator) -> StoreResult<()> {
        let id = parse_locator(locator)?;
        let mut state = lock(&self.state)?;
        if state.faults.reject_delete {
            state.log.push(StoreOp::DeleteRejected(locator.clone()));
            return Err(StoreError::PermissionDenied(locator.to_string()));
        }
        if state.entries.remove(&id).is_none() {
            return Err(StoreError::NotFound(locator.to_string()));
        }
        state.edits.retain(|(edited, _)| *edited != id);
        state.log.push(StoreOp::Delete(locator.clone()));
        Ok(())
    }

    fn query_meta(&self, locator: &Locator) -> StoreResult<EntryMeta> {
        let id = parse_locator(locator)?;
        let state = lock(&self.state)?;
        let entry = state.entry(id, locator)?;
        Ok(EntryMeta {
            display_name: entry.display_name.clone(),
            relative_path: entry.relative_path.clone(),
        })
    }

    fn mark_edited(&self, locator: &Locator, edit: &EditRecord) -> StoreResult<()> {
        let id = parse_locator(locator)?;
        let mut state = lock(&self.state)?;
        state.entry(id, locator)?;
        state.edits.push((id, edit.clone()));
        Ok(())
    }

    fn edited_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        let edited: Vec<u64> = lock(&self.state)?.edits.iter().map(|(id, _)| *id).collect();
        self.records_where(|id, _| edited.contains(&id))
    }
}

/// Buffers bytes and commits them to the entry on flush (and on drop)
struct MemoryWriter {
    state: Arc<Mutex<MemoryState>>,
    id: u64,
    locator: Locator,
    buffer: Vec<u8>,
    dirty: bool,
}

impl MemoryWriter {
    fn commit(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        let entry = state
            .entries
            .get_mut(&self.id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, self.locator.to_string()))?;
        entry.bytes = self.buffer.clone();
        state.log.push(StoreOp::Write(self.locator.clone()));
        self.dirty = false;
        Ok(())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.dirty {
            self.commit()?;
        }
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if self.dirty {
            // The entry may have been discarded meanwhile
            let _ = self.commit();
        }
    }
}

fn lock(state: &Mutex<MemoryState>) -> StoreResult<MutexGuard<'_, MemoryState>> {
    state
        .lock()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
}

fn make_locator(id: u64) -> Locator {
    Locator::new(format!("{}{}", LOCATOR_PREFIX, id))
}

fn parse_locator(locator: &Locator) -> StoreResult<u64> {
    locator
        .as_str()
        .strip_prefix(LOCATOR_PREFIX)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| StoreError::InvalidLocator(locator.to_string()))
}

fn to_record(id: u64, entry: &MemoryEntry) -> MediaRecord {
    MediaRecord {
        id: id.to_string(),
        locator: make_locator(id),
        display_name: entry.display_name.clone(),
    }
}
