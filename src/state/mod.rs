//! State management module
//!
//! This module handles all media state, including:
//! - Shared data structures (data.rs)
//! - Edit records for filtered photos (edit.rs)
//! - The media store contract (store.rs)
//! - SQLite catalog + files on disk (library.rs)
//! - In-memory store with fault injection (memory.rs)

pub mod data;
pub mod edit;
pub mod library;
pub mod memory;
pub mod store;

pub use data::{EntryMeta, Locator, MediaRecord, NewEntry};
pub use edit::EditRecord;
pub use library::Library;
pub use memory::MemoryStore;
pub use store::MediaStore;
