//! PhotoRepository — keeps each photo's metadata document and its original
//! blob consistent across create, update and delete.
//!
//! Nothing here is atomic across the two stores. Writes run as ordered
//! sequences so that a failure part-way leaves a known state:
//!
//! - create writes the blob first, then the document. A failed document
//!   write leaves an orphan blob, which is logged and left in place.
//! - delete removes the original blob, then the thumbnail, then the
//!   document. A failure before the last step leaves a record whose image
//!   fetch 404s; retrying the delete finishes the job.

use crate::{
    models::photo::{NewPhoto, PhotoRecord, PhotoUpdate, original_path, thumbnail_path},
    services::{
        blob_store::BlobStore,
        error::{GalleryError, GalleryResult, StoreError},
        metadata_store::{MetadataStore, is_reserved_key},
    },
};
use chrono::Utc;
use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Concurrent document fetches during a full listing.
const LIST_FETCH_CONCURRENCY: usize = 16;

#[derive(Clone)]
pub struct PhotoRepository {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PhotoRepository {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    /// Blob store backing this repository, for serving image bytes.
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Store a new photo: blob at `originals/{fileName}`, then the document.
    pub async fn create(&self, upload: NewPhoto) -> GalleryResult<PhotoRecord> {
        if upload.bytes.is_empty() {
            return Err(GalleryError::InvalidInput("No file uploaded".into()));
        }

        let id = Uuid::new_v4().to_string();
        let file_name = derive_file_name(&id, &upload.original_name);

        let record = PhotoRecord {
            id: id.clone(),
            file_name: file_name.clone(),
            size: upload.bytes.len() as u64,
            mime_type: upload.mime_type.clone(),
            title: upload
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| upload.original_name.clone()),
            description: upload.description.unwrap_or_default(),
            original_name: upload.original_name,
            uploaded_at: Utc::now().into(),
            updated_at: None,
        };

        self.blobs
            .put(&original_path(&file_name), upload.bytes, Some(upload.mime_type.as_str()))
            .await
            .map_err(GalleryError::StorageWrite)?;

        if let Err(err) = self.write_record(&record).await {
            error!(
                "metadata write for photo {} failed after its blob was stored; orphan blob left at {}",
                id,
                record.original_path()
            );
            return Err(err);
        }

        info!("created photo {} ({} bytes)", id, record.size);
        Ok(record)
    }

    /// Look up one record. The reserved settings key is never a photo.
    pub async fn read(&self, id: &str) -> GalleryResult<PhotoRecord> {
        if is_reserved_key(id) {
            return Err(GalleryError::NotFound(id.to_string()));
        }

        let raw = self
            .metadata
            .get(id)
            .await
            .map_err(GalleryError::StorageRead)?
            .ok_or_else(|| GalleryError::NotFound(id.to_string()))?;

        parse_record(id, &raw).map_err(GalleryError::StorageRead)
    }

    /// Apply a partial edit. Not an upsert: a missing record is `NotFound`
    /// and nothing is written.
    pub async fn update(&self, id: &str, changes: PhotoUpdate) -> GalleryResult<PhotoRecord> {
        let mut record = self.read(id).await?;

        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(description) = changes.description {
            record.description = description;
        }
        record.updated_at = Some(Utc::now());

        self.write_record(&record).await?;
        info!("updated photo {}", id);
        Ok(record)
    }

    /// Remove both blobs, then the document.
    pub async fn delete(&self, id: &str) -> GalleryResult<()> {
        let record = self.read(id).await?;

        self.blobs
            .delete(&original_path(&record.file_name))
            .await
            .map_err(GalleryError::StorageWrite)?;

        if let Err(err) = self.blobs.delete(&thumbnail_path(&record.file_name)).await {
            warn!("failed to remove thumbnail for photo {}: {}", id, err);
        }

        self.metadata
            .delete(id)
            .await
            .map_err(GalleryError::StorageWrite)?;

        info!("deleted photo {}", id);
        Ok(())
    }

    /// Every readable photo record, in no particular order.
    ///
    /// Missing or unparseable documents are skipped with a warning; only a
    /// failure to list the keys themselves is an error.
    pub async fn list_all(&self) -> GalleryResult<Vec<PhotoRecord>> {
        let keys = self
            .metadata
            .list_keys()
            .await
            .map_err(GalleryError::StorageRead)?;

        let records = stream::iter(keys.into_iter().filter(|k| !is_reserved_key(k)))
            .map(|key| async move {
                let fetched = self.metadata.get(&key).await;
                (key, fetched)
            })
            .buffered(LIST_FETCH_CONCURRENCY)
            .filter_map(|(key, fetched)| async move {
                match fetched {
                    Ok(Some(raw)) => match parse_record(&key, &raw) {
                        Ok(record) => Some(record),
                        Err(err) => {
                            warn!("skipping unreadable photo document {}: {}", key, err);
                            None
                        }
                    },
                    Ok(None) => {
                        debug!("photo document {} vanished during listing", key);
                        None
                    }
                    Err(err) => {
                        warn!("skipping photo document {}: {}", key, err);
                        None
                    }
                }
            })
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }

    async fn write_record(&self, record: &PhotoRecord) -> GalleryResult<()> {
        let doc = serde_json::to_string(record)
            .map_err(|err| GalleryError::StorageWrite(StoreError::Serialization(err)))?;
        self.metadata
            .put(&record.id, &doc)
            .await
            .map_err(GalleryError::StorageWrite)
    }
}

/// The document's key is authoritative for `id`.
fn parse_record(key: &str, raw: &str) -> Result<PhotoRecord, StoreError> {
    let mut record: PhotoRecord = serde_json::from_str(raw)?;
    record.id = key.to_string();
    Ok(record)
}

/// `{id}.{ext}` using the original name's extension verbatim, or `{id}` when
/// the name has no usable extension.
fn derive_file_name(id: &str, original_name: &str) -> String {
    let ext = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{blob::BlobAttributes, photo::UploadedAt},
        services::{
            blob_store::{BlobObject, DiskBlobStore},
            error::StoreResult,
            metadata_store::{SETTINGS_KEY, SqliteMetadataStore},
            pagination::paginate,
            testing::{disk_store, memory_pool, metadata_store, read_all},
        },
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    type Fixture = (
        PhotoRepository,
        Arc<SqliteMetadataStore>,
        Arc<DiskBlobStore>,
        TempDir,
    );

    async fn repository() -> Fixture {
        let metadata = Arc::new(metadata_store().await);
        let (blobs, dir) = disk_store().await;
        let blobs = Arc::new(blobs);
        let repo = PhotoRepository::new(metadata.clone(), blobs.clone());
        (repo, metadata, blobs, dir)
    }

    fn upload(name: &str, bytes: &'static [u8]) -> NewPhoto {
        NewPhoto {
            bytes: Bytes::from_static(bytes),
            mime_type: "image/jpeg".into(),
            original_name: name.into(),
            title: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let (repo, _, blobs, _dir) = repository().await;

        let created = repo.create(upload("beach.jpg", b"jpeg-bytes")).await.unwrap();
        assert_eq!(created.file_name, format!("{}.jpg", created.id));
        assert_eq!(created.title, "beach.jpg");
        assert_eq!(created.description, "");
        assert_eq!(created.updated_at, None);

        let read = repo.read(&created.id).await.unwrap();
        assert_eq!(read, created);
        assert_eq!(read.size, 10);
        assert_eq!(read.mime_type, "image/jpeg");

        let object = blobs.get(&read.original_path()).await.unwrap();
        assert_eq!(object.attributes.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(read_all(object).await, b"jpeg-bytes".to_vec());
    }

    #[tokio::test]
    async fn create_keeps_supplied_title_and_description() {
        let (repo, _, _, _dir) = repository().await;
        let mut new = upload("x.png", b"png");
        new.title = Some("Sunset".into());
        new.description = Some("over the bay".into());

        let created = repo.create(new).await.unwrap();
        assert_eq!(created.title, "Sunset");
        assert_eq!(created.description, "over the bay");
    }

    #[tokio::test]
    async fn create_rejects_empty_upload() {
        let (repo, metadata, _, _dir) = repository().await;
        let err = repo.create(upload("empty.jpg", b"")).await.unwrap_err();
        assert!(matches!(err, GalleryError::InvalidInput(_)));
        assert!(metadata.list_keys().await.unwrap().is_empty());
    }

    #[test]
    fn file_name_uses_extension_verbatim_or_none() {
        assert_eq!(derive_file_name("id", "a.JPG"), "id.JPG");
        assert_eq!(derive_file_name("id", "archive.tar.gz"), "id.gz");
        assert_eq!(derive_file_name("id", "README"), "id");
        assert_eq!(derive_file_name("id", "trailing."), "id");
        assert_eq!(derive_file_name("id", "weird.a/b"), "id");
    }

    #[tokio::test]
    async fn read_missing_and_reserved_keys_are_not_found() {
        let (repo, metadata, _, _dir) = repository().await;
        metadata
            .put(SETTINGS_KEY, r#"{"siteTitle":"x"}"#)
            .await
            .unwrap();

        assert!(matches!(
            repo.read("nope").await,
            Err(GalleryError::NotFound(_))
        ));
        assert!(matches!(
            repo.read(SETTINGS_KEY).await,
            Err(GalleryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_changes_only_the_given_field() {
        let (repo, _, _, _dir) = repository().await;
        let mut new = upload("a.jpg", b"a");
        new.description = Some("keep me".into());
        let before = repo.create(new).await.unwrap();

        let after = repo
            .update(
                &before.id,
                PhotoUpdate {
                    title: Some("X".into()),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(after.title, "X");
        assert!(after.updated_at.is_some());
        let mut expected = before.clone();
        expected.title = "X".into();
        expected.updated_at = after.updated_at;
        assert_eq!(after, expected);
        assert_eq!(repo.read(&before.id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn update_is_not_an_upsert() {
        let (repo, metadata, _, _dir) = repository().await;
        let err = repo
            .update("ghost", PhotoUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::NotFound(_)));
        assert_eq!(metadata.get("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_record_and_both_blobs() {
        let (repo, _, blobs, _dir) = repository().await;
        let record = repo.create(upload("gone.jpg", b"bytes")).await.unwrap();
        blobs
            .put(&record.thumbnail_path(), Bytes::from_static(b"t"), None)
            .await
            .unwrap();

        repo.delete(&record.id).await.unwrap();

        assert!(matches!(
            repo.read(&record.id).await,
            Err(GalleryError::NotFound(_))
        ));
        assert!(matches!(
            blobs.get(&record.original_path()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            blobs.get(&record.thumbnail_path()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&record.id).await,
            Err(GalleryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_retry_finishes_a_partial_delete() {
        let (repo, _, blobs, _dir) = repository().await;
        let record = repo.create(upload("half.jpg", b"bytes")).await.unwrap();

        // Simulate a crash after the original blob went away.
        blobs.delete(&record.original_path()).await.unwrap();
        assert!(repo.read(&record.id).await.is_ok());

        repo.delete(&record.id).await.unwrap();
        assert!(matches!(
            repo.read(&record.id).await,
            Err(GalleryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_all_skips_settings_and_corrupt_documents() {
        let (repo, metadata, _, _dir) = repository().await;
        let a = repo.create(upload("a.jpg", b"a")).await.unwrap();
        let b = repo.create(upload("b.jpg", b"b")).await.unwrap();
        metadata
            .put(
                SETTINGS_KEY,
                r#"{"fileName":"x","originalName":"x","size":1,"mimeType":"x","uploadedAt":"2024-01-01T00:00:00Z"}"#,
            )
            .await
            .unwrap();
        metadata.put("corrupt", "{not json").await.unwrap();

        let mut ids: Vec<_> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    const UNDATED_DOC: &str = r#"{"fileName":"undated.jpg","originalName":"u.jpg","size":5,"mimeType":"image/jpeg","uploadedAt":"not-a-date"}"#;

    #[tokio::test]
    async fn unparseable_upload_date_is_listed_after_dated_photos() {
        let (repo, metadata, _, _dir) = repository().await;
        let dated = repo.create(upload("a.jpg", b"a")).await.unwrap();
        metadata.put("undated", UNDATED_DOC).await.unwrap();

        let record = repo.read("undated").await.unwrap();
        assert_eq!(record.uploaded_at, UploadedAt::Unparsed(json!("not-a-date")));

        let page = paginate(repo.list_all().await.unwrap(), 1, 10);
        let ids: Vec<_> = page.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![dated.id.as_str(), "undated"]);
    }

    #[tokio::test]
    async fn unparseable_upload_date_survives_update_and_delete() {
        let (repo, metadata, blobs, _dir) = repository().await;
        metadata.put("undated", UNDATED_DOC).await.unwrap();
        blobs
            .put("originals/undated.jpg", Bytes::from_static(b"bytes"), None)
            .await
            .unwrap();

        let edited = repo
            .update(
                "undated",
                PhotoUpdate {
                    title: Some("found".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        let stored = metadata.get_json("undated").await.unwrap().unwrap();
        assert_eq!(stored["uploadedAt"], json!("not-a-date"));
        assert_eq!(edited.title, "found");

        repo.delete("undated").await.unwrap();
        assert_eq!(metadata.get("undated").await.unwrap(), None);
        assert!(matches!(
            blobs.get("originals/undated.jpg").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn legacy_type_field_is_accepted() {
        let (repo, metadata, _, _dir) = repository().await;
        metadata
            .put(
                "legacy",
                r#"{"fileName":"legacy.png","originalName":"l.png","size":3,"type":"image/png","title":"t","description":"","uploadedAt":"2024-02-03T04:05:06.000Z"}"#,
            )
            .await
            .unwrap();

        let record = repo.read("legacy").await.unwrap();
        assert_eq!(record.id, "legacy");
        assert_eq!(record.mime_type, "image/png");
    }

    /// Blob store whose writes always fail.
    struct FailingBlobs;

    #[async_trait]
    impl BlobStore for FailingBlobs {
        async fn put(
            &self,
            path: &str,
            _bytes: Bytes,
            _content_type: Option<&str>,
        ) -> StoreResult<BlobAttributes> {
            Err(StoreError::Io(std::io::Error::other(format!("disk full: {path}"))))
        }

        async fn get(&self, path: &str) -> StoreResult<BlobObject> {
            Err(StoreError::NotFound(path.to_string()))
        }

        async fn delete(&self, _path: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    /// Metadata store that can be switched to reject writes.
    struct FlakyMetadata {
        inner: SqliteMetadataStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl MetadataStore for FlakyMetadata {
        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, document: &str) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("metadata offline")));
            }
            self.inner.put(key, document).await
        }

        async fn delete(&self, key: &str) -> StoreResult<()> {
            self.inner.delete(key).await
        }

        async fn list_keys(&self) -> StoreResult<Vec<String>> {
            self.inner.list_keys().await
        }
    }

    #[tokio::test]
    async fn failed_blob_write_leaves_no_record() {
        let metadata = Arc::new(metadata_store().await);
        let repo = PhotoRepository::new(metadata.clone(), Arc::new(FailingBlobs));

        let err = repo.create(upload("a.jpg", b"a")).await.unwrap_err();
        assert!(matches!(err, GalleryError::StorageWrite(_)));
        assert!(metadata.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_metadata_write_surfaces_and_leaves_orphan_blob() {
        let pool = memory_pool().await;
        let metadata = Arc::new(FlakyMetadata {
            inner: SqliteMetadataStore::new(pool.clone()),
            fail_writes: AtomicBool::new(true),
        });
        let (blobs, _dir) = disk_store().await;
        let blobs = Arc::new(blobs);
        let repo = PhotoRepository::new(metadata.clone(), blobs.clone());

        let err = repo.create(upload("a.jpg", b"a")).await.unwrap_err();
        assert!(matches!(err, GalleryError::StorageWrite(_)));
        assert!(repo.list_all().await.unwrap().is_empty());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blobs")
            .fetch_one(&*blobs.db)
            .await
            .unwrap();
        assert_eq!(orphans, 1);
    }

    #[tokio::test]
    async fn failed_update_write_is_reported() {
        let metadata = Arc::new(FlakyMetadata {
            inner: metadata_store().await,
            fail_writes: AtomicBool::new(false),
        });
        let (blobs, _dir) = disk_store().await;
        let repo = PhotoRepository::new(metadata.clone(), Arc::new(blobs));
        let record = repo.create(upload("a.jpg", b"a")).await.unwrap();

        metadata.fail_writes.store(true, Ordering::SeqCst);
        let err = repo
            .update(
                &record.id,
                PhotoUpdate {
                    title: Some("new".into()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::StorageWrite(_)));
        assert_eq!(repo.read(&record.id).await.unwrap().title, "a.jpg");
    }
}
