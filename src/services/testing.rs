//! Fixtures shared by the service unit tests.

use crate::{
    db,
    services::{
        blob_store::{BlobObject, DiskBlobStore},
        metadata_store::SqliteMetadataStore,
    },
};
use bytes::Bytes;
use futures::TryStreamExt;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

pub async fn memory_pool() -> Arc<SqlitePool> {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    Arc::new(pool)
}

/// Disk store rooted in a fresh temp dir. Keep the `TempDir` alive for the
/// length of the test; dropping it removes the directory.
pub async fn disk_store() -> (DiskBlobStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = DiskBlobStore::new(memory_pool().await, dir.path().to_path_buf());
    (store, dir)
}

pub async fn metadata_store() -> SqliteMetadataStore {
    SqliteMetadataStore::new(memory_pool().await)
}

pub async fn read_all(object: BlobObject) -> Vec<u8> {
    let chunks: Vec<Bytes> = object.body.try_collect().await.unwrap();
    chunks.concat()
}
