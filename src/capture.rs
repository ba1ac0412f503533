//! Camera capture
//!
//! The camera itself is a collaborator behind the `Camera` trait. A capture
//! is stored in the album through the same staged write as filtered copies.

use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::SaveSettings;
use crate::error::{CaptureError, Fault, SaveError};
use crate::pipeline::naming::capture_file_name;
use crate::pipeline::{blocking, write_staged, SaveOutcome, StepError};
use crate::state::{Locator, MediaStore, NewEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lens {
    #[default]
    Back,
    Front,
}

impl Lens {
    pub fn toggled(self) -> Self {
        match self {
            Lens::Back => Lens::Front,
            Lens::Front => Lens::Back,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

impl FlashMode {
    /// Off -> On -> Auto -> Off
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Auto,
            FlashMode::Auto => FlashMode::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureOptions {
    pub lens: Lens,
    pub flash: FlashMode,
}

/// Source of encoded (JPEG) pictures
pub trait Camera: Send + Sync {
    fn take_picture(&self, options: &CaptureOptions) -> Result<Vec<u8>, CaptureError>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Success(Locator),
    Error(String),
}

/// Take one picture and store it in `settings.album`
pub async fn capture_photo(
    camera: Arc<dyn Camera>,
    store: &Arc<dyn MediaStore>,
    settings: &SaveSettings,
    options: CaptureOptions,
) -> Result<SaveOutcome, Fault> {
    match store_capture(camera, store, settings, options).await {
        Ok(locator) => {
            info!(%locator, "photo captured");
            Ok(SaveOutcome::Success(locator))
        }
        Err(StepError::Failed(err)) => {
            warn!(error = %err, "capture failed");
            Ok(SaveOutcome::Error(err))
        }
        Err(StepError::Fault(fault)) => Err(fault),
    }
}

async fn store_capture(
    camera: Arc<dyn Camera>,
    store: &Arc<dyn MediaStore>,
    settings: &SaveSettings,
    options: CaptureOptions,
) -> Result<Locator, StepError> {
    let bytes = blocking(move || camera.take_picture(&options))
        .await?
        .map_err(SaveError::from)?;

    let name = capture_file_name(&Local::now());
    let entry = NewEntry::staged_jpeg(name, settings.album.clone());
    write_staged(store, entry, Arc::new(bytes)).await
}

/// Capture options and state for one camera screen
pub struct CaptureController {
    camera: Arc<dyn Camera>,
    store: Arc<dyn MediaStore>,
    settings: SaveSettings,
    options: CaptureOptions,
    state: watch::Sender<CaptureState>,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn Camera>, store: Arc<dyn MediaStore>, settings: SaveSettings) -> Self {
        let (state, _) = watch::channel(CaptureState::Idle);
        Self {
            camera,
            store,
            settings,
            options: CaptureOptions::default(),
            state,
        }
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    pub fn toggle_lens(&mut self) -> Lens {
        self.options.lens = self.options.lens.toggled();
        self.options.lens
    }

    pub fn cycle_flash(&mut self) -> FlashMode {
        self.options.flash = self.options.flash.next();
        self.options.flash
    }

    pub fn state(&self) -> CaptureState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptureState> {
        self.state.subscribe()
    }

    pub fn reset_state(&self) {
        self.state.send_replace(CaptureState::Idle);
    }

    pub async fn capture(&self) -> CaptureState {
        self.state.send_replace(CaptureState::Capturing);

        let next = match capture_photo(
            Arc::clone(&self.camera),
            &self.store,
            &self.settings,
            self.options,
        )
        .await
        {
            Ok(SaveOutcome::Success(locator)) => CaptureState::Success(locator),
            Ok(SaveOutcome::Error(err)) => CaptureState::Error(err.to_string()),
            Err(fault) => CaptureState::Error(fault.to_string()),
        };

        self.state.send_replace(next.clone());
        next
    }
}
