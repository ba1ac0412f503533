//! Filter session for one opened photo
//!
//! Tracks the preset picked for preview and drives a save through
//! `Idle -> Processing -> Success | Error`. Observers follow the state through
//! a watch channel.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::filter::FilterPreset;
use crate::pipeline::{blocking, FilterPipeline, SaveOutcome};
use crate::state::{EditRecord, Locator, MediaRecord};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Processing,
    Success(Locator),
    Error(String),
}

pub struct FilterSession {
    pipeline: Arc<FilterPipeline>,
    record: MediaRecord,
    current: Option<FilterPreset>,
    state: watch::Sender<SaveState>,
}

impl FilterSession {
    /// Open the photo at `locator`
    pub fn open(pipeline: Arc<FilterPipeline>, locator: &Locator) -> StoreResult<Self> {
        let record = pipeline.store().record(locator)?;
        debug!(%locator, name = %record.display_name, "session opened");

        let (state, _) = watch::channel(SaveState::Idle);
        Ok(Self {
            pipeline,
            record,
            current: None,
            state,
        })
    }

    /// The photo this session edits; switches to the copy after a copy save
    pub fn record(&self) -> &MediaRecord {
        &self.record
    }

    pub fn set_preview_filter(&mut self, preset: &FilterPreset) {
        self.current = Some(preset.clone());
    }

    /// Preset picked for preview, if any
    pub fn current_filter(&self) -> Option<&FilterPreset> {
        self.current.as_ref()
    }

    pub fn state(&self) -> SaveState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.subscribe()
    }

    pub fn reset_state(&self) {
        self.state.send_replace(SaveState::Idle);
    }

    /// Save the photo with `preset` applied and return the final state
    pub async fn apply_filter(&mut self, preset: &FilterPreset, create_new_copy: bool) -> SaveState {
        self.state.send_replace(SaveState::Processing);

        let source = self.record.locator.clone();
        let outcome = self
            .pipeline
            .save_filtered(&source, &preset.transform, create_new_copy)
            .await;

        let next = match outcome {
            Ok(SaveOutcome::Success(saved)) => {
                self.adopt(preset, create_new_copy, &saved).await;
                SaveState::Success(saved)
            }
            Ok(SaveOutcome::Error(err)) => SaveState::Error(err.to_string()),
            Err(fault) => SaveState::Error(fault.to_string()),
        };

        self.state.send_replace(next.clone());
        next
    }

    /// Record the edit and point the session at the saved photo
    async fn adopt(&mut self, preset: &FilterPreset, create_new_copy: bool, saved: &Locator) {
        let store = Arc::clone(self.pipeline.store());
        let edit = EditRecord::new(preset, create_new_copy);
        let target = saved.clone();

        let stored = blocking(move || -> Result<MediaRecord, StoreError> {
            store.mark_edited(&target, &edit)?;
            store.record(&target)
        })
        .await;

        let stored = match stored {
            Ok(Ok(record)) => Some(record),
            Ok(Err(e)) => {
                warn!(locator = %saved, error = %e, "could not record edit");
                None
            }
            Err(fault) => {
                warn!(locator = %saved, error = %fault, "could not record edit");
                None
            }
        };

        let display_name = if create_new_copy {
            format!("{}_{}", file_stem(&self.record.display_name), preset.name)
        } else {
            stored
                .as_ref()
                .map(|r| r.display_name.clone())
                .unwrap_or_else(|| self.record.display_name.clone())
        };

        self.record = MediaRecord {
            id: stored.map(|r| r.id).unwrap_or_else(|| saved.to_string()),
            locator: saved.clone(),
            display_name,
        };
        self.current = Some(preset.clone());
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}
