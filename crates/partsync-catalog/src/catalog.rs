//! The narrow contract the pipeline needs from a catalog store.

use std::future::Future;

use partsync_core::Collection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// One page of raw catalog entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub meta: Option<PageMeta>,
}

/// Create/find/update/delete access to catalog collections.
///
/// Entries travel as raw JSON so one implementation serves every
/// collection; typed decoding happens in [`crate::CatalogIndex`].
pub trait Catalog: Send + Sync {
    /// Fetch one 1-based page of `collection`.
    fn list_page(
        &self,
        collection: Collection,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, CatalogError>> + Send;

    /// Entries whose `field` equals `value`.
    fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<Vec<Value>, CatalogError>> + Send;

    fn get(
        &self,
        collection: Collection,
        id: i64,
    ) -> impl Future<Output = Result<Option<Value>, CatalogError>> + Send;

    /// Create an entry and return it as stored, including its new `id`.
    fn create(
        &self,
        collection: Collection,
        data: &Value,
    ) -> impl Future<Output = Result<Value, CatalogError>> + Send;

    fn update(
        &self,
        collection: Collection,
        id: i64,
        data: &Value,
    ) -> impl Future<Output = Result<Value, CatalogError>> + Send;

    fn delete(
        &self,
        collection: Collection,
        id: i64,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    fn count(&self, collection: Collection)
        -> impl Future<Output = Result<u64, CatalogError>> + Send;
}
