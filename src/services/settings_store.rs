//! Single-document site configuration kept under the reserved settings key.

use crate::{
    models::settings::SiteSettings,
    services::{
        error::{GalleryError, GalleryResult},
        metadata_store::{MetadataStore, SETTINGS_KEY},
    },
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct SettingsStore {
    metadata: Arc<dyn MetadataStore>,
}

impl SettingsStore {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// The stored document, or an empty object. Never fails: read errors and
    /// non-object documents are logged and reported as `{}`.
    pub async fn get(&self) -> Map<String, Value> {
        match self.metadata.get_json(SETTINGS_KEY).await {
            Ok(Some(Value::Object(doc))) => doc,
            Ok(Some(other)) => {
                warn!("settings document is not an object: {}", other);
                Map::new()
            }
            Ok(None) => Map::new(),
            Err(err) => {
                warn!("failed to read settings document: {}", err);
                Map::new()
            }
        }
    }

    /// Settings with defaults resolved.
    pub async fn resolved(&self) -> SiteSettings {
        SiteSettings::from_document(&self.get().await)
    }

    /// Replace the whole document. Callers merge before calling.
    pub async fn put(&self, document: Value) -> GalleryResult<()> {
        if !document.is_object() {
            return Err(GalleryError::InvalidInput(
                "settings must be a JSON object".into(),
            ));
        }
        self.metadata
            .put(SETTINGS_KEY, &document.to_string())
            .await
            .map_err(GalleryError::StorageWrite)?;
        info!("site settings replaced");
        Ok(())
    }
}
