//! Site-wide options read out of the stored settings document.

use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_SITE_TITLE: &str = "My Gallery";
pub const DEFAULT_SITE_KEYWORDS: &str = "gallery,photos,images";
pub const DEFAULT_SITE_DESCRIPTION: &str = "Every moment, carefully collected";
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// How the public gallery pages through photos.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    #[default]
    Pagination,
    Infinite,
}

/// Settings with every default applied.
///
/// The stored document is kept as raw JSON and never validated on write;
/// this view resolves each field independently whenever it is read.
/// Missing fields, empty strings, wrong JSON types and non-positive page
/// sizes all fall back to the default.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_title: String,
    pub site_keywords: String,
    pub site_description: String,
    pub head_code: String,
    pub footer_code: String,
    pub copyright: String,
    pub load_mode: LoadMode,
    pub page_size: usize,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self::from_document(&Map::new())
    }
}

impl SiteSettings {
    pub fn from_document(doc: &Map<String, Value>) -> Self {
        let text = |field: &str, default: &str| {
            doc.get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let load_mode = match doc.get("loadMode").and_then(Value::as_str) {
            Some("infinite") => LoadMode::Infinite,
            _ => LoadMode::Pagination,
        };

        let page_size = doc
            .get("pageSize")
            .and_then(Value::as_u64)
            .filter(|n| *n >= 1)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self {
            site_title: text("siteTitle", DEFAULT_SITE_TITLE),
            site_keywords: text("siteKeywords", DEFAULT_SITE_KEYWORDS),
            site_description: text("siteDescription", DEFAULT_SITE_DESCRIPTION),
            head_code: text("headCode", ""),
            footer_code: text("footerCode", ""),
            copyright: text("copyright", ""),
            load_mode,
            page_size,
        }
    }
}
