//! Error types shared by the stores and the gallery core.

use std::io;
use thiserror::Error;

/// Failures raised by a blob or metadata backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("invalid storage path `{0}`")]
    InvalidPath(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the photo repository, the settings store and the
/// pagination engine to their callers.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage write failed: {0}")]
    StorageWrite(#[source] StoreError),
    #[error("storage read failed: {0}")]
    StorageRead(#[source] StoreError),
    #[error("unauthorized")]
    Unauthorized,
}

pub type GalleryResult<T> = Result<T, GalleryError>;
