//! Which resize a requested image variant needs.
//!
//! Resizing itself happens outside this service; the directives chosen here
//! are passed along as response headers for a fronting image resizer.

use crate::models::photo::{ORIGINALS_NAMESPACE, THUMBNAILS_NAMESPACE, original_path};

/// Size requested through `?size=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeHint {
    Thumbnail,
    Medium,
    Original,
}

impl SizeHint {
    /// Unknown or missing values mean the original.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("thumbnail") => SizeHint::Thumbnail,
            Some("medium") => SizeHint::Medium,
            _ => SizeHint::Original,
        }
    }

    pub fn resize(self) -> Option<ResizeDirective> {
        match self {
            SizeHint::Thumbnail => Some(ResizeDirective {
                fit: "cover",
                width: 300,
                height: Some(300),
            }),
            SizeHint::Medium => Some(ResizeDirective {
                fit: "scale-down",
                width: 800,
                height: None,
            }),
            SizeHint::Original => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDirective {
    pub fit: &'static str,
    pub width: u32,
    pub height: Option<u32>,
}

/// Blob path that actually serves `namespace/file_name`.
///
/// Thumbnails are never persisted, so both namespaces read the original and
/// rely on the resize directive instead. Unknown namespaces yield `None`.
pub fn source_path(namespace: &str, file_name: &str) -> Option<String> {
    match namespace {
        ORIGINALS_NAMESPACE | THUMBNAILS_NAMESPACE => Some(original_path(file_name)),
        _ => None,
    }
}
