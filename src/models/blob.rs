//! Attributes recorded for every payload held by the blob store.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Metadata for a single blob, keyed by its logical path.
///
/// The payload bytes live on disk; this row carries what is needed to serve
/// them back (content type and cache validator).
#[derive(Clone, FromRow, Debug, PartialEq)]
pub struct BlobAttributes {
    /// Logical path, e.g. `originals/{fileName}`.
    pub path: String,

    /// Content type supplied by the writer.
    pub content_type: Option<String>,

    /// Hex MD5 of the payload, used as the etag.
    pub etag: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Timestamp of the last write.
    pub last_modified: DateTime<Utc>,
}
