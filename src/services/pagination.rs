//! Stable, ordered paging over the repository's unordered full listing.
//!
//! Order is `uploaded_at` descending, with unparseable timestamps after all
//! valid ones. Records that compare equal are ordered by `id` ascending, so
//! the result never depends on the order in which the metadata store
//! happened to return keys.

use crate::models::photo::PhotoRecord;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Requested page, echoed back without clamping.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct Page {
    pub photos: Vec<PhotoRecord>,
    pub pagination: PaginationMeta,
}

/// Gallery order: most recent first, unparseable timestamps last, then id
/// ascending.
pub fn gallery_order(a: &PhotoRecord, b: &PhotoRecord) -> Ordering {
    a.uploaded_at
        .newest_first(&b.uploaded_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort `records` into gallery order and cut out page `page` (1-based).
///
/// `page` and `page_size` below 1 are treated as 1. Pages past the end are
/// empty with `has_more = false`.
pub fn paginate(mut records: Vec<PhotoRecord>, page: usize, page_size: usize) -> Page {
    let page = page.max(1);
    let page_size = page_size.max(1);

    records.sort_by(gallery_order);

    let total = records.len();
    let total_pages = total.div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    let photos = records.drain(start..end).collect();

    Page {
        photos,
        pagination: PaginationMeta {
            page,
            page_size,
            total,
            total_pages,
            has_more: page < total_pages,
        },
    }
}
