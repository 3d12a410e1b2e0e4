//! Exhaustive multi-page fetch of one collection.

use std::time::Duration;

use partsync_core::Collection;
use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::pagination::is_last_page;

/// Maximum number of pages to fetch before returning an error.
/// Prevents infinite loops on a catalog that never reports a last page.
///
/// Each page request may be retried up to `max_retries` times by the HTTP
/// client, so the worst-case request count is `MAX_PAGES * (1 + max_retries)`.
pub const MAX_PAGES: usize = 1_000;

/// Fetches every entry of `collection` by iterating through all pages.
///
/// `inter_request_delay_ms` is applied between page requests (not before
/// the first).
///
/// **All-or-nothing semantics**: on any page failure the entries fetched so
/// far are discarded and the error is returned. A partial index would make
/// the reconciler create records that already exist.
///
/// # Errors
///
/// Propagates any error from [`Catalog::list_page`].
/// Returns [`CatalogError::PaginationLimit`] if the number of pages exceeds
/// [`MAX_PAGES`].
pub async fn fetch_all<C: Catalog>(
    catalog: &C,
    collection: Collection,
    page_size: u32,
    inter_request_delay_ms: u64,
) -> Result<Vec<Value>, CatalogError> {
    let mut all: Vec<Value> = Vec::new();
    let mut page = 0u32;
    let mut page_requests = 0usize;

    loop {
        page_requests += 1;
        if page_requests > MAX_PAGES {
            return Err(CatalogError::PaginationLimit {
                collection: collection.to_string(),
                max_pages: MAX_PAGES,
            });
        }

        if page > 0 && inter_request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(inter_request_delay_ms)).await;
        }
        page += 1;

        let response = catalog.list_page(collection, page, page_size).await?;
        let received = response.items.len();
        all.extend(response.items);

        if is_last_page(page, page_size, received, response.meta.as_ref()) {
            break;
        }
    }

    tracing::debug!(
        collection = %collection,
        entries = all.len(),
        pages = page,
        "collection fetched"
    );
    Ok(all)
}
