//! Page-number pagination over catalog list endpoints.
//!
//! List responses carry a `meta.pagination` block:
//!
//! ```text
//! { "data": [...], "meta": { "pagination": { "page": 2, "pageSize": 100, "pageCount": 3, "total": 250 } } }
//! ```
//!
//! The loop stops on the first of: an empty page, a page shorter than the
//! effective page size, the reported `pageCount`, or the reported `total`
//! having been covered. The effective page size
//! is the one the catalog reports, since it may cap the requested size.

use crate::catalog::PageMeta;

/// Returns `true` when no page after `page` needs to be requested.
#[must_use]
pub fn is_last_page(page: u32, requested_size: u32, received: usize, meta: Option<&PageMeta>) -> bool {
    if received == 0 {
        return true;
    }
    if let Some(page_count) = meta.and_then(|m| m.page_count) {
        if page >= page_count {
            return true;
        }
    }
    let effective_size = meta
        .map(|m| m.page_size)
        .filter(|&s| s > 0)
        .unwrap_or(requested_size);
    if let Some(total) = meta.and_then(|m| m.total) {
        if u64::from(page) * u64::from(effective_size) >= total {
            return true;
        }
    }
    received < effective_size as usize
}

/// Number of page requests needed for `total` entries at `page_size`.
#[must_use]
pub fn page_count_for(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}
