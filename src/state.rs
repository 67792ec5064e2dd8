//! Shared state handed to every handler.

use crate::services::{
    blob_store::DiskBlobStore, metadata_store::SqliteMetadataStore,
    photo_repository::PhotoRepository, session::SessionValidator, settings_store::SettingsStore,
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub photos: PhotoRepository,
    pub settings: SettingsStore,
    pub sessions: Arc<dyn SessionValidator>,

    /// Pool and blob root, probed by `/readyz`.
    pub db: Arc<SqlitePool>,
    pub storage_dir: PathBuf,
}

impl AppState {
    /// Wire the SQLite-backed metadata store and the disk blob store together.
    pub fn new(
        db: Arc<SqlitePool>,
        storage_dir: impl Into<PathBuf>,
        sessions: Arc<dyn SessionValidator>,
    ) -> Self {
        let storage_dir = storage_dir.into();
        let metadata = Arc::new(SqliteMetadataStore::new(db.clone()));
        let blobs = Arc::new(DiskBlobStore::new(db.clone(), storage_dir.clone()));

        Self {
            photos: PhotoRepository::new(metadata.clone(), blobs),
            settings: SettingsStore::new(metadata),
            sessions,
            db,
            storage_dir,
        }
    }
}
