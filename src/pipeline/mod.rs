//! Save pipeline
//!
//! Reads a source photo, applies a transform and stores the result, either
//! as a new copy or over the original. Business failures come back as
//! `SaveOutcome::Error`; only faults (unreachable store, crashed worker)
//! escape as `Err`.
//!
//! - File naming (naming.rs)
//! - JPEG encoding (encode.rs)
//! - Per-source serialization (lock.rs)
//! - Hidden-then-published writes (staged.rs)
//! - The overwrite fallback (saga.rs)

pub mod encode;
pub mod lock;
pub mod naming;
pub mod saga;
pub mod staged;

use chrono::Local;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, warn};

use crate::color::ColorTransform;
use crate::config::SaveSettings;
use crate::error::{Fault, RenderError, SaveError, StoreError};
use crate::render::{self, PixelBuffer};
use crate::state::store::{read_all, write_all};
use crate::state::{Locator, MediaStore, NewEntry};

pub use encode::encode_jpeg;
pub use lock::LocatorLocks;
pub use saga::{OverwriteSaga, SagaReport};
pub use staged::{write_staged, StagedEntry};

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Where the filtered photo now lives
    Success(Locator),
    Error(SaveError),
}

impl SaveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SaveOutcome::Success(_))
    }

    pub fn locator(&self) -> Option<&Locator> {
        match self {
            SaveOutcome::Success(locator) => Some(locator),
            SaveOutcome::Error(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Locator, SaveError> {
        match self {
            SaveOutcome::Success(locator) => Ok(locator),
            SaveOutcome::Error(err) => Err(err),
        }
    }
}

/// Why a pipeline step stopped
#[derive(Debug)]
pub enum StepError {
    Failed(SaveError),
    Fault(Fault),
}

impl From<SaveError> for StepError {
    fn from(err: SaveError) -> Self {
        StepError::Failed(err)
    }
}

impl From<Fault> for StepError {
    fn from(fault: Fault) -> Self {
        StepError::Fault(fault)
    }
}

/// Classify a store error: an unreachable store is a fault, anything else
/// fails the request with `kind`.
pub(crate) fn store_failure(err: StoreError, kind: fn(String) -> SaveError) -> StepError {
    match err {
        StoreError::Unavailable(msg) => StepError::Fault(Fault::StoreUnavailable(msg)),
        other => StepError::Failed(kind(other.to_string())),
    }
}

/// Run blocking I/O or pixel work off the async workers
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, Fault>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(task::spawn_blocking(f).await?)
}

pub struct FilterPipeline {
    store: Arc<dyn MediaStore>,
    settings: SaveSettings,
    locks: LocatorLocks,
}

impl FilterPipeline {
    pub fn new(store: Arc<dyn MediaStore>, settings: SaveSettings) -> Self {
        Self {
            store,
            settings,
            locks: LocatorLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    pub fn settings(&self) -> &SaveSettings {
        &self.settings
    }

    /// Filter `source` and store the result.
    ///
    /// With `create_new_copy` the original is never touched. Otherwise the
    /// original is overwritten in place, or replaced through the fallback
    /// saga when the store refuses the overwrite. Saves of the same source
    /// run one at a time. Dropping the returned future before it completes
    /// leaves no visible partial entry behind.
    pub async fn save_filtered(
        &self,
        source: &Locator,
        transform: &ColorTransform,
        create_new_copy: bool,
    ) -> Result<SaveOutcome, Fault> {
        let _guard = self.locks.acquire(source).await;
        info!(%source, create_new_copy, "saving filtered photo");

        match self.run(source, *transform, create_new_copy).await {
            Ok(locator) => {
                info!(%source, saved = %locator, "filtered photo saved");
                Ok(SaveOutcome::Success(locator))
            }
            Err(StepError::Failed(err)) => {
                warn!(%source, error = %err, "save failed");
                Ok(SaveOutcome::Error(err))
            }
            Err(StepError::Fault(fault)) => {
                warn!(%source, error = %fault, "save aborted by fault");
                Err(fault)
            }
        }
    }

    async fn run(
        &self,
        source: &Locator,
        transform: ColorTransform,
        create_new_copy: bool,
    ) -> Result<Locator, StepError> {
        let original = self.decode(source).await?;

        // Any engine failure at this step is reported as a failed transform
        let filtered = blocking(move || render::apply(&original, &transform))
            .await?
            .map_err(|e| match e {
                RenderError::TransformFailed(msg) => SaveError::TransformFailed(msg),
                other => SaveError::TransformFailed(other.to_string()),
            })?;

        let quality = self.settings.quality();
        let bytes = Arc::new(blocking(move || encode_jpeg(&filtered, quality)).await??);
        debug!(%source, bytes = bytes.len(), quality, "encoded filtered photo");

        if create_new_copy {
            self.write_copy(bytes).await
        } else {
            self.overwrite(source, bytes).await
        }
    }

    async fn decode(&self, source: &Locator) -> Result<PixelBuffer, StepError> {
        let store = Arc::clone(&self.store);
        let locator = source.clone();
        let bytes = blocking(move || read_all(store.as_ref(), &locator))
            .await?
            .map_err(|e| store_failure(e, SaveError::DecodeFailed))?;

        let buffer = blocking(move || PixelBuffer::decode(&bytes))
            .await?
            .map_err(SaveError::from)?;
        debug!(%source, width = buffer.width(), height = buffer.height(), "decoded source");
        Ok(buffer)
    }

    async fn write_copy(&self, bytes: Arc<Vec<u8>>) -> Result<Locator, StepError> {
        let name = naming::edit_file_name(&self.settings.edit_prefix, &Local::now());
        let entry = NewEntry::staged_jpeg(name, self.settings.album.clone());
        write_staged(&self.store, entry, bytes).await
    }

    async fn overwrite(&self, source: &Locator, bytes: Arc<Vec<u8>>) -> Result<Locator, StepError> {
        let store = Arc::clone(&self.store);
        let target = source.clone();
        let payload = Arc::clone(&bytes);

        match blocking(move || write_all(store.as_ref(), &target, &payload)).await? {
            Ok(()) => Ok(source.clone()),
            Err(StoreError::Unavailable(msg)) => Err(Fault::StoreUnavailable(msg).into()),
            Err(e) => {
                warn!(%source, error = %e, "direct overwrite refused, replacing instead");
                let saga = OverwriteSaga::new(
                    Arc::clone(&self.store),
                    source.clone(),
                    self.settings.album.clone(),
                );
                let report = saga.run(bytes).await?;
                Ok(report.locator)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::builder;
    use crate::state::memory::{FaultPlan, StoreOp};
    use crate::state::MemoryStore;
    use crate::testing::{eventually, first_pixel, png_bytes, GatedStore};
    use std::sync::mpsc;
    use std::time::Duration;

    const ORANGE: [u8; 4] = [200, 100, 50, 255];

    fn setup() -> (MemoryStore, FilterPipeline, Locator) {
        let memory = MemoryStore::new();
        let source = memory.add_photo("photo.png", png_bytes(8, 8, ORANGE)).unwrap();
        let pipeline = FilterPipeline::new(Arc::new(memory.clone()), SaveSettings::default());
        (memory, pipeline, source)
    }

    fn assert_near(actual: [u8; 4], expected: [u8; 3]) {
        for c in 0..3 {
            let diff = (actual[c] as i32 - expected[c] as i32).abs();
            assert!(diff <= 3, "channel {}: {} vs {}", c, actual[c], expected[c]);
        }
    }

    #[tokio::test]
    async fn test_new_copy_leaves_original_untouched() {
        let (memory, pipeline, source) = setup();
        let before = memory.bytes(&source).unwrap();

        let outcome = pipeline
            .save_filtered(&source, &builder::saturation(0.0), true)
            .await
            .unwrap();
        let saved = outcome.into_result().unwrap();

        assert_ne!(saved, source);
        assert_eq!(memory.bytes(&source).unwrap(), before);
        assert_eq!(memory.list_photos().unwrap().len(), 2);

        let meta = memory.query_meta(&saved).unwrap();
        assert!(meta.display_name.starts_with("LUMIFY_EDIT_"));
        assert!(meta.display_name.ends_with(".jpg"));
        assert_eq!(meta.relative_path, "Pictures/Lumify");

        let pixel = first_pixel(&memory.bytes(&saved).unwrap().unwrap());
        assert_near(pixel, [127, 127, 127]);
    }

    #[tokio::test]
    async fn test_overwrite_in_place() {
        let (memory, pipeline, source) = setup();

        let outcome = pipeline
            .save_filtered(&source, &builder::brightness(20.0), false)
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::Success(source.clone()));
        assert_eq!(memory.entry_count().unwrap(), 1);
        let pixel = first_pixel(&memory.bytes(&source).unwrap().unwrap());
        assert_near(pixel, [220, 120, 70]);
    }

    #[tokio::test]
    async fn test_refused_overwrite_replaces_original() {
        let (memory, pipeline, source) = setup();
        memory
            .set_faults(FaultPlan { reject_overwrite: true, ..FaultPlan::default() })
            .unwrap();

        let outcome = pipeline
            .save_filtered(&source, &builder::brightness(20.0), false)
            .await
            .unwrap();
        let saved = outcome.into_result().unwrap();

        assert_ne!(saved, source);
        assert_eq!(memory.bytes(&source).unwrap(), None);
        assert_eq!(memory.query_meta(&saved).unwrap().display_name, "photo (1).png");

        let log = memory.log().unwrap();
        assert_eq!(log[1], StoreOp::OverwriteRejected(source.clone()));
        let published = log.iter().position(|op| *op == StoreOp::Publish(saved.clone()));
        let deleted = log.iter().position(|op| *op == StoreOp::Delete(source.clone()));
        assert!(published.unwrap() < deleted.unwrap());
    }

    #[tokio::test]
    async fn test_fallback_delete_failure_is_still_success() {
        let (memory, pipeline, source) = setup();
        memory
            .set_faults(FaultPlan {
                reject_overwrite: true,
                reject_delete: true,
                ..FaultPlan::default()
            })
            .unwrap();

        let outcome = pipeline
            .save_filtered(&source, &builder::sepia(1.0), false)
            .await
            .unwrap();

        let saved = outcome.into_result().unwrap();
        assert_ne!(saved, source);
        assert!(memory.record(&source).is_ok());
        assert_eq!(memory.list_photos().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_source() {
        let memory = MemoryStore::new();
        let source = memory.add_photo("junk.jpg", b"not an image".to_vec()).unwrap();
        let pipeline = FilterPipeline::new(Arc::new(memory.clone()), SaveSettings::default());

        let outcome = pipeline
            .save_filtered(&source, &builder::identity(), true)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Error(SaveError::DecodeFailed(_))));
        assert_eq!(memory.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (_, pipeline, _) = setup();
        let outcome = pipeline
            .save_filtered(&Locator::new("memory://images/404"), &builder::identity(), true)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Error(SaveError::DecodeFailed(_))));
    }

    #[tokio::test]
    async fn test_non_finite_transform() {
        let (memory, pipeline, source) = setup();
        let outcome = pipeline
            .save_filtered(&source, &builder::brightness(f32::NAN), true)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Error(SaveError::TransformFailed(_))));
        assert_eq!(memory.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refused_insert() {
        let (memory, pipeline, source) = setup();
        memory
            .set_faults(FaultPlan { fail_insert: true, ..FaultPlan::default() })
            .unwrap();

        let outcome = pipeline
            .save_filtered(&source, &builder::identity(), true)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Error(SaveError::WriteFailed(_))));
        assert_eq!(memory.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_copies_of_one_source() {
        let (memory, pipeline, source) = setup();

        let (sepia, gray) = (builder::sepia(1.0), builder::saturation(0.0));
        let (a, b) = tokio::join!(
            pipeline.save_filtered(&source, &sepia, true),
            pipeline.save_filtered(&source, &gray, true),
        );
        let a = a.unwrap().into_result().unwrap();
        let b = b.unwrap().into_result().unwrap();

        assert_ne!(a, b);
        assert_eq!(memory.list_photos().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_save_leaves_no_visible_entry() {
        let memory = MemoryStore::new();
        let source = memory.add_photo("photo.png", png_bytes(8, 8, ORANGE)).unwrap();
        let (open, gate) = mpsc::channel();
        let pipeline = FilterPipeline::new(
            Arc::new(GatedStore::new(Arc::new(memory.clone()), gate)),
            SaveSettings::default(),
        );

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            pipeline.save_filtered(&source, &builder::sepia(1.0), true),
        )
        .await;
        assert!(result.is_err());

        // Let the stalled writer run into the discarded entry
        let _ = open.send(());
        assert!(eventually(|| memory.entry_count().unwrap() == 1).await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(memory.entry_count().unwrap(), 1);
        let listed: Vec<_> = memory.list_photos().unwrap().into_iter().map(|r| r.locator).collect();
        assert_eq!(listed, vec![source]);
        assert!(!memory
            .log()
            .unwrap()
            .iter()
            .any(|op| matches!(op, StoreOp::Publish(_))));
    }
}
