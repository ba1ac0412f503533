//! Test helpers shared across modules

use std::io::{Cursor, Read, Write};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::StoreResult;
use crate::state::{EditRecord, EntryMeta, Locator, MediaRecord, MediaStore, NewEntry};

/// PNG bytes of a solid `width` x `height` image
pub fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Decode stored bytes and return the first pixel
pub fn first_pixel(bytes: &[u8]) -> [u8; 4] {
    image::load_from_memory(bytes).unwrap().to_rgba8().get_pixel(0, 0).0
}

/// Poll `check` for up to a second, for effects that land on the blocking pool
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// A store whose first `open_write` blocks until the gate opens
pub struct GatedStore {
    inner: Arc<dyn MediaStore>,
    gate: Mutex<Option<Receiver<()>>>,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn MediaStore>, gate: Receiver<()>) -> Self {
        Self {
            inner,
            gate: Mutex::new(Some(gate)),
        }
    }
}

impl MediaStore for GatedStore {
    fn list_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        self.inner.list_photos()
    }

    fn record(&self, locator: &Locator) -> StoreResult<MediaRecord> {
        self.inner.record(locator)
    }

    fn open_read(&self, locator: &Locator) -> StoreResult<Box<dyn Read + Send>> {
        self.inner.open_read(locator)
    }

    fn insert(&self, entry: &NewEntry) -> StoreResult<Locator> {
        self.inner.insert(entry)
    }

    fn set_pending(&self, locator: &Locator, pending: bool) -> StoreResult<()> {
        self.inner.set_pending(locator, pending)
    }

    fn open_write(&self, locator: &Locator) -> StoreResult<Box<dyn Write + Send>> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.inner.open_write(locator)
    }

    fn delete(&self, locator: &Locator) -> StoreResult<()> {
        self.inner.delete(locator)
    }

    fn query_meta(&self, locator: &Locator) -> StoreResult<EntryMeta> {
        self.inner.query_meta(locator)
    }

    fn mark_edited(&self, locator: &Locator, edit: &EditRecord) -> StoreResult<()> {
        self.inner.mark_edited(locator, edit)
    }

    fn edited_photos(&self) -> StoreResult<Vec<MediaRecord>> {
        self.inner.edited_photos()
    }
}
