//! Flat key -> JSON document mapping.
//!
//! Photo records and the site settings share this one namespace. The
//! settings singleton lives under [`SETTINGS_KEY`]; photo ids are UUID v4
//! strings and can never equal it.

use crate::services::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

/// Reserved key holding the site settings document.
pub const SETTINGS_KEY: &str = "site_settings";

/// True for keys that never name a photo record.
pub fn is_reserved_key(key: &str) -> bool {
    key == SETTINGS_KEY
}

/// Single-key document operations plus a full key scan. There are no
/// secondary indexes and no transactions spanning keys.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Raw document at `key`, or `None` when absent. Does not parse.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `document` at `key`, replacing whatever was there.
    async fn put(&self, key: &str, document: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Every key currently present.
    async fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// Document at `key` parsed as JSON.
    async fn get_json(&self, key: &str) -> StoreResult<Option<Value>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// `MetadataStore` backed by the SQLite `documents` table.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.db)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, document: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO documents (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(document)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;
        debug!("stored document {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("document {} already missing", key);
        }
        Ok(())
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM documents ORDER BY key ASC")
            .fetch_all(&*self.db)
            .await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::metadata_store;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let store = metadata_store().await;

        assert_eq!(store.get("k1").await.unwrap(), None);
        store.put("k1", r#"{"a":1}"#).await.unwrap();
        assert_eq!(store.get_json("k1").await.unwrap(), Some(json!({"a": 1})));

        store.put("k1", r#"{"b":2}"#).await.unwrap();
        assert_eq!(store.get_json("k1").await.unwrap(), Some(json!({"b": 2})));

        store.delete("k1").await.unwrap();
        store.delete("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_keys_includes_every_key() {
        let store = metadata_store().await;
        store.put("b", "{}").await.unwrap();
        store.put(SETTINGS_KEY, "{}").await.unwrap();
        store.put("a", "{}").await.unwrap();

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["a", "b", SETTINGS_KEY]);
    }

    #[tokio::test]
    async fn get_json_surfaces_corrupt_documents() {
        let store = metadata_store().await;
        store.put("broken", "{not json").await.unwrap();
        assert!(matches!(
            store.get_json("broken").await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn uuid_ids_are_never_reserved() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(!is_reserved_key(&id));
        assert!(is_reserved_key(SETTINGS_KEY));
    }
}
