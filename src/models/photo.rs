//! Represents an uploaded photo and the edits accepted for it.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;

/// Metadata document for one uploaded image.
///
/// Stored as JSON under its `id` in the metadata store. The image bytes live
/// in the blob store at `originals/{file_name}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    /// Opaque identifier (UUID v4), also the metadata key.
    #[serde(default)]
    pub id: String,

    /// Generated blob name, `{id}.{ext}` or just `{id}`.
    pub file_name: String,

    /// File name as uploaded.
    pub original_name: String,

    /// Size in bytes as reported by the uploader.
    pub size: u64,

    /// MIME type as reported by the uploader.
    #[serde(alias = "type")]
    pub mime_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub uploaded_at: UploadedAt,

    /// Set on every metadata edit; absent until the first one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PhotoRecord {
    /// Logical blob path of the original image.
    pub fn original_path(&self) -> String {
        original_path(&self.file_name)
    }

    /// Logical blob path of the derived thumbnail.
    pub fn thumbnail_path(&self) -> String {
        thumbnail_path(&self.file_name)
    }
}

/// Upload instant as stored in the document.
///
/// Older documents may hold a value that is not an RFC 3339 timestamp. Such a
/// value is kept verbatim, written back unchanged, and sorts after every
/// valid instant.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadedAt {
    At(DateTime<Utc>),
    Unparsed(Value),
}

impl UploadedAt {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            UploadedAt::At(at) => Some(*at),
            UploadedAt::Unparsed(_) => None,
        }
    }

    /// Most recent first; unparsed values last and equal to each other.
    pub fn newest_first(&self, other: &Self) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn from_value(raw: Value) -> Self {
        let parsed = match &raw {
            Value::String(s) => DateTime::<FixedOffset>::parse_from_rfc3339(s)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        };
        match parsed {
            Some(at) => UploadedAt::At(at),
            None => UploadedAt::Unparsed(raw),
        }
    }
}

impl Default for UploadedAt {
    fn default() -> Self {
        UploadedAt::Unparsed(Value::Null)
    }
}

impl From<DateTime<Utc>> for UploadedAt {
    fn from(at: DateTime<Utc>) -> Self {
        UploadedAt::At(at)
    }
}

impl Serialize for UploadedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UploadedAt::At(at) => at.serialize(serializer),
            UploadedAt::Unparsed(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for UploadedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(UploadedAt::from_value)
    }
}

pub const ORIGINALS_NAMESPACE: &str = "originals";
pub const THUMBNAILS_NAMESPACE: &str = "thumbnails";

pub fn original_path(file_name: &str) -> String {
    format!("{}/{}", ORIGINALS_NAMESPACE, file_name)
}

pub fn thumbnail_path(file_name: &str) -> String {
    format!("{}/{}", THUMBNAILS_NAMESPACE, file_name)
}

/// Editable fields; anything left `None` keeps its current value.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PhotoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Everything needed to create a photo from an upload.
#[derive(Clone, Debug)]
pub struct NewPhoto {
    pub bytes: bytes::Bytes,
    pub mime_type: String,
    pub original_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uploaded_at_accepts_iso_strings_and_epoch_millis() {
        let iso: UploadedAt = serde_json::from_value(json!("2024-02-03T04:05:06.000Z")).unwrap();
        let millis: UploadedAt = serde_json::from_value(json!(1_706_933_106_000i64)).unwrap();
        assert!(iso.instant().is_some());
        assert_eq!(iso.instant(), millis.instant());
    }

    #[test]
    fn unparsed_uploaded_at_is_written_back_verbatim() {
        let raw: UploadedAt = serde_json::from_value(json!("last tuesday")).unwrap();
        assert_eq!(raw, UploadedAt::Unparsed(json!("last tuesday")));
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!("last tuesday"));
    }

    #[test]
    fn unparsed_uploaded_at_sorts_after_valid_instants() {
        let valid = UploadedAt::from(Utc::now());
        let junk = UploadedAt::Unparsed(json!("?"));
        assert_eq!(valid.newest_first(&junk), Ordering::Less);
        assert_eq!(junk.newest_first(&valid), Ordering::Greater);
        assert_eq!(junk.newest_first(&UploadedAt::default()), Ordering::Equal);
    }
}
