//! Staged writes
//!
//! A new entry is inserted hidden, filled, and only then published. If the
//! owning future is dropped or a step fails before publishing, the hidden
//! entry is deleted, so a partially written file never shows up in listings.

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{blocking, store_failure, StepError};
use crate::error::SaveError;
use crate::state::store::write_all;
use crate::state::{Locator, MediaStore, NewEntry};

/// A hidden entry that is discarded unless published
pub struct StagedEntry {
    store: Arc<dyn MediaStore>,
    locator: Locator,
    published: bool,
}

impl StagedEntry {
    /// Insert `entry` as pending
    pub async fn create(store: &Arc<dyn MediaStore>, mut entry: NewEntry) -> Result<Self, StepError> {
        entry.pending = true;
        let inserter = Arc::clone(store);
        let locator = blocking(move || inserter.insert(&entry))
            .await?
            .map_err(|e| store_failure(e, SaveError::WriteFailed))?;

        debug!(%locator, "staged entry created");
        Ok(Self {
            store: Arc::clone(store),
            locator,
            published: false,
        })
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Write the full payload into the hidden entry
    pub async fn write(&self, bytes: Arc<Vec<u8>>) -> Result<(), StepError> {
        let store = Arc::clone(&self.store);
        let locator = self.locator.clone();
        let len = bytes.len();
        blocking(move || write_all(store.as_ref(), &locator, &bytes))
            .await?
            .map_err(|e| store_failure(e, SaveError::WriteFailed))?;

        debug!(locator = %self.locator, bytes = len, "staged entry written");
        Ok(())
    }

    /// Make the entry visible; from here on it is no longer discarded
    pub async fn publish(mut self) -> Result<Locator, StepError> {
        let store = Arc::clone(&self.store);
        let locator = self.locator.clone();
        blocking(move || store.set_pending(&locator, false))
            .await?
            .map_err(|e| store_failure(e, SaveError::WriteFailed))?;

        self.published = true;
        debug!(locator = %self.locator, "staged entry published");
        Ok(self.locator.clone())
    }
}

impl Drop for StagedEntry {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        let store = Arc::clone(&self.store);
        let locator = self.locator.clone();
        // Inside a runtime the delete goes to the blocking pool, off the async worker
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || discard(store.as_ref(), &locator));
            }
            Err(_) => discard(store.as_ref(), &locator),
        }
    }
}

fn discard(store: &dyn MediaStore, locator: &Locator) {
    match store.delete(locator) {
        Ok(()) => debug!(%locator, "discarded unpublished entry"),
        Err(e) => warn!(
            %locator,
            error = %e,
            "could not discard unpublished entry; it stays hidden"
        ),
    }
}

/// Insert hidden, write `bytes`, publish. Returns the published locator.
pub async fn write_staged(
    store: &Arc<dyn MediaStore>,
    entry: NewEntry,
    bytes: Arc<Vec<u8>>,
) -> Result<Locator, StepError> {
    let staged = StagedEntry::create(store, entry).await?;
    staged.write(bytes).await?;
    staged.publish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::{FaultPlan, StoreOp};
    use crate::state::MemoryStore;
    use crate::testing::eventually;

    fn stores() -> (MemoryStore, Arc<dyn MediaStore>) {
        let memory = MemoryStore::new();
        let shared: Arc<dyn MediaStore> = Arc::new(memory.clone());
        (memory, shared)
    }

    #[tokio::test]
    async fn test_write_staged_publishes_after_write() {
        let (memory, store) = stores();
        let locator = write_staged(
            &store,
            NewEntry::staged_jpeg("a.jpg", "Pictures"),
            Arc::new(vec![1, 2, 3]),
        )
        .await
        .unwrap();

        assert_eq!(memory.is_pending(&locator).unwrap(), Some(false));
        assert_eq!(memory.bytes(&locator).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(
            memory.log().unwrap(),
            vec![
                StoreOp::Insert(locator.clone()),
                StoreOp::Write(locator.clone()),
                StoreOp::Publish(locator),
            ]
        );
    }

    #[tokio::test]
    async fn test_unpublished_entry_is_discarded() {
        let (memory, store) = stores();
        let staged = StagedEntry::create(&store, NewEntry::staged_jpeg("b.jpg", "Pictures"))
            .await
            .unwrap();
        staged.write(Arc::new(vec![7])).await.unwrap();
        let locator = staged.locator().clone();
        assert_eq!(memory.is_pending(&locator).unwrap(), Some(true));

        drop(staged);
        assert!(eventually(|| memory.is_pending(&locator).unwrap().is_none()).await);
        assert!(memory.list_photos().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undeletable_entry_stays_hidden() {
        let (memory, store) = stores();
        memory
            .set_faults(FaultPlan { reject_delete: true, ..FaultPlan::default() })
            .unwrap();

        let staged = StagedEntry::create(&store, NewEntry::staged_jpeg("c.jpg", "Pictures"))
            .await
            .unwrap();
        let locator = staged.locator().clone();
        drop(staged);

        let rejected = StoreOp::DeleteRejected(locator.clone());
        assert!(eventually(|| memory.log().unwrap().contains(&rejected)).await);
        assert_eq!(memory.is_pending(&locator).unwrap(), Some(true));
        assert!(memory.list_photos().unwrap().is_empty());
    }

    #[test]
    fn test_drop_outside_runtime_discards_immediately() {
        let (memory, store) = stores();
        let locator = store.insert(&NewEntry::staged_jpeg("e.jpg", "Pictures")).unwrap();
        drop(StagedEntry {
            store,
            locator: locator.clone(),
            published: false,
        });

        assert_eq!(memory.is_pending(&locator).unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_failure_is_write_failure() {
        let (memory, store) = stores();
        memory
            .set_faults(FaultPlan { fail_insert: true, ..FaultPlan::default() })
            .unwrap();

        let result = StagedEntry::create(&store, NewEntry::staged_jpeg("d.jpg", "Pictures")).await;
        assert!(matches!(result, Err(StepError::Failed(SaveError::WriteFailed(_)))));
    }
}
