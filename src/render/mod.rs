//! Pixel rendering module
//!
//! This module handles:
//! - Decoding source bytes into writable RGBA buffers (buffer.rs)
//! - Applying a color transform to a buffer (engine.rs)
//! - Downsized per-preset previews for the filter picker (preview.rs)

pub mod buffer;
pub mod engine;
pub mod preview;

pub use buffer::PixelBuffer;
pub use engine::apply;
