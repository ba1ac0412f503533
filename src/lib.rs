//! Lumify core
//!
//! Color filters for a photo gallery and the pipeline that saves filtered
//! photos back into a media store.
//!
//! - `color`: 4x5 color transforms, builders and composition
//! - `filter`: named presets and the built-in catalog
//! - `render`: decoded pixel buffers, the transform engine, previews
//! - `state`: the media store contract and its implementations
//! - `pipeline`: decode, transform, encode and store, with the overwrite fallback
//! - `session` / `capture`: UI-facing state machines
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod capture;
pub mod color;
pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use color::ColorTransform;
pub use config::{Config, SaveSettings};
pub use error::{Fault, SaveError, StoreError};
pub use filter::{FilterCatalog, FilterPreset};
pub use pipeline::{FilterPipeline, SaveOutcome};
pub use render::PixelBuffer;
pub use session::{FilterSession, SaveState};
pub use state::{Library, Locator, MediaRecord, MediaStore, MemoryStore};
