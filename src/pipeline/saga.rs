//! Overwrite fallback
//!
//! When the store refuses a direct overwrite, the filtered bytes go into a
//! fresh entry named like the original, and the original is deleted after.
//! Step one must fully succeed before step two runs. Step two is best-effort
//! and never undoes step one.

use std::sync::Arc;
use tracing::{info, warn};

use super::staged::write_staged;
use super::{blocking, StepError};
use crate::error::{Fault, SaveError, StoreError};
use crate::state::{EntryMeta, Locator, MediaStore, NewEntry};

/// Display name used when the original's metadata can't be read
pub const FALLBACK_NAME: &str = "filtered_image.jpg";

/// Result of the first step: the replacement is published
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub original: Locator,
    pub locator: Locator,
}

/// What the saga did overall
#[derive(Debug, Clone, PartialEq)]
pub struct SagaReport {
    /// The published replacement
    pub locator: Locator,
    pub original_retired: bool,
    /// Why the original is still there, if it is
    pub delete_error: Option<SaveError>,
}

pub struct OverwriteSaga {
    store: Arc<dyn MediaStore>,
    original: Locator,
    fallback_album: String,
}

impl OverwriteSaga {
    pub fn new(store: Arc<dyn MediaStore>, original: Locator, fallback_album: impl Into<String>) -> Self {
        Self {
            store,
            original,
            fallback_album: fallback_album.into(),
        }
    }

    /// Run both steps
    pub async fn run(&self, bytes: Arc<Vec<u8>>) -> Result<SagaReport, StepError> {
        let replacement = self.write_replacement(bytes).await?;
        Ok(self.retire_original(replacement).await)
    }

    /// Step one: publish a replacement entry carrying `bytes`
    pub async fn write_replacement(&self, bytes: Arc<Vec<u8>>) -> Result<Replacement, StepError> {
        let meta = self.original_meta().await?;
        let entry = NewEntry::staged_jpeg(meta.display_name, meta.relative_path);
        let locator = write_staged(&self.store, entry, bytes).await?;

        info!(original = %self.original, replacement = %locator, "replacement published");
        Ok(Replacement {
            original: self.original.clone(),
            locator,
        })
    }

    /// Step two: delete the original. Failures are reported, not returned.
    pub async fn retire_original(&self, replacement: Replacement) -> SagaReport {
        let store = Arc::clone(&self.store);
        let original = replacement.original.clone();

        let delete_error = match blocking(move || store.delete(&original)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(SaveError::DeleteFailed(e.to_string())),
            Err(fault) => Some(SaveError::DeleteFailed(fault.to_string())),
        };

        match &delete_error {
            None => info!(original = %replacement.original, "original retired"),
            Some(err) => warn!(
                original = %replacement.original,
                replacement = %replacement.locator,
                error = %err,
                "original kept alongside its replacement"
            ),
        }

        SagaReport {
            locator: replacement.locator,
            original_retired: delete_error.is_none(),
            delete_error,
        }
    }

    async fn original_meta(&self) -> Result<EntryMeta, StepError> {
        let store = Arc::clone(&self.store);
        let original = self.original.clone();

        match blocking(move || store.query_meta(&original)).await? {
            Ok(meta) => Ok(meta),
            Err(StoreError::Unavailable(msg)) => Err(Fault::StoreUnavailable(msg).into()),
            Err(e) => {
                warn!(original = %self.original, error = %e, "original metadata unreadable, using defaults");
                Ok(EntryMeta {
                    display_name: FALLBACK_NAME.to_string(),
                    relative_path: self.fallback_album.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::{FaultPlan, StoreOp};
    use crate::state::MemoryStore;

    fn setup() -> (MemoryStore, Arc<dyn MediaStore>, Locator) {
        let memory = MemoryStore::new();
        let original = memory.add_photo("photo.jpg", vec![1]).unwrap();
        let store: Arc<dyn MediaStore> = Arc::new(memory.clone());
        (memory, store, original)
    }

    fn position(log: &[StoreOp], op: &StoreOp) -> usize {
        log.iter().position(|o| o == op).unwrap()
    }

    #[tokio::test]
    async fn test_replacement_is_published_before_original_is_deleted() {
        let (memory, store, original) = setup();
        let saga = OverwriteSaga::new(store, original.clone(), "Pictures/Lumify");

        let report = saga.run(Arc::new(vec![2, 2])).await.unwrap();
        assert!(report.original_retired);
        assert_eq!(report.delete_error, None);

        let log = memory.log().unwrap();
        let published = position(&log, &StoreOp::Publish(report.locator.clone()));
        let deleted = position(&log, &StoreOp::Delete(original.clone()));
        assert!(published < deleted);

        assert_eq!(memory.bytes(&original).unwrap(), None);
        assert_eq!(memory.bytes(&report.locator).unwrap(), Some(vec![2, 2]));
        // Named while the original still existed
        assert_eq!(
            memory.query_meta(&report.locator).unwrap().display_name,
            "photo (1).jpg"
        );
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_replacement() {
        let (memory, store, original) = setup();
        memory
            .set_faults(FaultPlan { reject_delete: true, ..FaultPlan::default() })
            .unwrap();
        let saga = OverwriteSaga::new(store, original.clone(), "Pictures/Lumify");

        let report = saga.run(Arc::new(vec![3])).await.unwrap();
        assert!(!report.original_retired);
        assert!(matches!(report.delete_error, Some(SaveError::DeleteFailed(_))));

        // Both remain visible
        assert_eq!(memory.list_photos().unwrap().len(), 2);
        assert_eq!(memory.bytes(&original).unwrap(), Some(vec![1]));
        assert_eq!(
            memory.query_meta(&report.locator).unwrap().display_name,
            "photo (1).jpg"
        );
    }

    #[tokio::test]
    async fn test_failed_replacement_never_deletes_original() {
        let (memory, store, original) = setup();
        memory
            .set_faults(FaultPlan { fail_insert: true, ..FaultPlan::default() })
            .unwrap();
        let saga = OverwriteSaga::new(store, original.clone(), "Pictures/Lumify");

        let result = saga.run(Arc::new(vec![4])).await;
        assert!(matches!(result, Err(StepError::Failed(SaveError::WriteFailed(_)))));
        assert_eq!(memory.bytes(&original).unwrap(), Some(vec![1]));
        assert!(!memory
            .log()
            .unwrap()
            .iter()
            .any(|op| matches!(op, StoreOp::Delete(_))));
    }

    #[tokio::test]
    async fn test_unreadable_meta_falls_back_to_defaults() {
        let memory = MemoryStore::new();
        let store: Arc<dyn MediaStore> = Arc::new(memory.clone());
        let gone = Locator::new("memory://images/99");
        let saga = OverwriteSaga::new(store, gone, "Pictures/Lumify");

        let replacement = saga.write_replacement(Arc::new(vec![5])).await.unwrap();
        let meta = memory.query_meta(&replacement.locator).unwrap();
        assert_eq!(meta.display_name, FALLBACK_NAME);
        assert_eq!(meta.relative_path, "Pictures/Lumify");

        let report = saga.retire_original(replacement).await;
        assert!(!report.original_retired);
    }
}
