//! Error types shared across the crate.

use thiserror::Error;

/// Errors reported by a media store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No entry exists for the locator.
    #[error("no media entry for {0}")]
    NotFound(String),

    /// The store refused the operation (e.g. platform write restrictions).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The locator was not issued by this store.
    #[error("malformed locator: {0}")]
    InvalidLocator(String),

    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog query failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store itself cannot be reached (poisoned lock, closed connection).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced while transforming pixels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Zero-width or zero-height buffer.
    #[error("invalid image: {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    /// The transform holds non-finite coefficients.
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// Source bytes could not be decoded.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Business failures of a save request. These are returned as values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// A zero-dimension buffer, reached through `From<RenderError>` when
    /// callers drive the render engine themselves. `FilterPipeline` reports
    /// every engine failure as `TransformFailed`.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("transform failed: {0}")]
    TransformFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Never aborts a save; surfaced only by the overwrite saga report.
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// The camera produced no picture.
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

impl From<RenderError> for SaveError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidImage { .. } => SaveError::InvalidImage(err.to_string()),
            RenderError::TransformFailed(msg) => SaveError::TransformFailed(msg),
            RenderError::DecodeFailed(msg) => SaveError::DecodeFailed(msg),
        }
    }
}

impl From<CaptureError> for SaveError {
    fn from(err: CaptureError) -> Self {
        SaveError::CaptureFailed(err.to_string())
    }
}

/// Unexpected faults. These escape the value-based outcome.
#[derive(Error, Debug)]
pub enum Fault {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors building a filter catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("duplicate filter id: {0}")]
    DuplicateId(String),

    #[error("catalog is empty")]
    Empty,

    #[error("first filter must be the identity, found {0}")]
    FirstNotIdentity(String),
}

/// Errors loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by a camera.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("capture failed: {0}")]
    Failed(String),
}
