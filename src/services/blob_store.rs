//! Binary storage addressed by logical path.
//!
//! `DiskBlobStore` keeps payloads on local disk sharded beneath
//! `base_path/{shard}/{shard}/{path}` and records their attributes in the
//! SQLite `blobs` table.

use crate::{
    models::blob::BlobAttributes,
    services::error::{StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

/// Streamed payload of a blob.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// A blob opened for reading.
pub struct BlobObject {
    pub attributes: BlobAttributes,
    pub body: ByteStream,
}

/// Core blob operations. Each call is atomic for its single path; nothing
/// spans more than one blob.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing payload.
    async fn put(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<BlobAttributes>;

    /// Open the blob at `path`. Returns `StoreError::NotFound` when absent.
    async fn get(&self, path: &str) -> StoreResult<BlobObject>;

    /// Remove the blob at `path`. Removing an absent blob succeeds.
    async fn delete(&self, path: &str) -> StoreResult<()>;
}

const MAX_BLOB_PATH_LEN: usize = 1024;

#[derive(Clone)]
pub struct DiskBlobStore {
    /// Shared SQLite pool holding the `blobs` table.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,
}

impl DiskBlobStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Rejects paths that could escape `base_path`.
    fn ensure_path_safe(path: &str) -> StoreResult<()> {
        let invalid = path.is_empty()
            || path.len() > MAX_BLOB_PATH_LEN
            || path.starts_with('/')
            || path.ends_with('/')
            || path.contains("..")
            || path
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    /// Two-level shard identifiers: the first two bytes of MD5(path) as hex.
    fn shards(path: &str) -> (String, String) {
        let digest = md5::compute(path);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn payload_path(&self, path: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(path);
        let mut full = self.base_path.clone();
        full.push(shard_a);
        full.push(shard_b);
        full.push(path);
        full
    }

    async fn fetch_attributes(&self, path: &str) -> StoreResult<BlobAttributes> {
        sqlx::query_as::<_, BlobAttributes>(
            "SELECT path, content_type, etag, size_bytes, last_modified
             FROM blobs WHERE path = ?",
        )
        .bind(path)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(path.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Remove empty directories from `start` up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    /// Writes through a temp file, fsyncs, renames into place and then
    /// upserts the attribute row. The payload is removed again if the row
    /// cannot be written.
    async fn put(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<BlobAttributes> {
        Self::ensure_path_safe(path)?;

        let file_path = self.payload_path(path);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::other("blob path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let etag = format!("{:x}", md5::compute(&bytes));
        let insert_result = sqlx::query_as::<_, BlobAttributes>(
            r#"
            INSERT INTO blobs (path, content_type, etag, size_bytes, last_modified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                content_type = excluded.content_type,
                etag = excluded.etag,
                size_bytes = excluded.size_bytes,
                last_modified = excluded.last_modified
            RETURNING path, content_type, etag, size_bytes, last_modified
            "#,
        )
        .bind(path)
        .bind(content_type)
        .bind(&etag)
        .bind(bytes.len() as i64)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(attrs) => {
                debug!("stored blob {} ({} bytes)", path, attrs.size_bytes);
                Ok(attrs)
            }
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// A row without its payload file is reported as `NotFound`.
    async fn get(&self, path: &str) -> StoreResult<BlobObject> {
        Self::ensure_path_safe(path)?;
        let attributes = self.fetch_attributes(path).await?;

        let file = File::open(self.payload_path(path))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StoreError::NotFound(path.to_string())
                } else {
                    StoreError::Io(err)
                }
            })?;

        Ok(BlobObject {
            attributes,
            body: Box::pin(ReaderStream::new(file)),
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        Self::ensure_path_safe(path)?;

        sqlx::query("DELETE FROM blobs WHERE path = ?")
            .bind(path)
            .execute(&*self.db)
            .await?;

        let file_path = self.payload_path(path);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }

        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
