//! In-memory catalog.
//!
//! Backs dry runs (seeded with a snapshot of the live catalog) and the
//! pipeline tests. Behaves like the HTTP catalog where the pipeline can
//! observe it: pages report `pageCount`, slugs are unique per collection, and
//! ids are assigned on create.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use partsync_core::Collection;
use serde_json::{Map, Value};

use crate::catalog::{Catalog, Page, PageMeta};
use crate::error::CatalogError;
use crate::fetch_all::fetch_all;
use crate::pagination::page_count_for;

/// Largest page the in-memory catalog serves, mirroring the HTTP catalog's cap.
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default)]
struct State {
    collections: HashMap<Collection, Vec<Value>>,
    next_id: i64,
    list_requests: HashMap<Collection, usize>,
    writes: HashMap<Collection, usize>,
    failing_writes: HashMap<Collection, u16>,
    failing_lists: HashMap<Collection, u16>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

fn entry_id(entry: &Value) -> Option<i64> {
    entry.get("id").and_then(Value::as_i64)
}

fn field_matches(entry: &Value, field: &str, value: &str) -> bool {
    match entry.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        Some(Value::Bool(b)) => b.to_string() == value,
        _ => false,
    }
}

fn status_error(collection: Collection, status: u16) -> CatalogError {
    CatalogError::UnexpectedStatus {
        status,
        url: format!("memory://{collection}"),
        message: "injected failure".to_owned(),
    }
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert entries as-is, assigning ids to entries that lack one.
    pub fn seed(&self, collection: Collection, entries: Vec<Value>) {
        let mut state = self.lock();
        for mut entry in entries {
            let id = match entry_id(&entry) {
                Some(id) => id,
                None => {
                    let id = state.next_id + 1;
                    if let Value::Object(map) = &mut entry {
                        map.insert("id".to_owned(), Value::from(id));
                    }
                    id
                }
            };
            state.next_id = state.next_id.max(id);
            state.collections.entry(collection).or_default().push(entry);
        }
    }

    /// Copy every entry of `collections` from another catalog.
    ///
    /// # Errors
    ///
    /// Propagates the first fetch error from `source`.
    pub async fn snapshot_of<C: Catalog>(
        source: &C,
        collections: &[Collection],
        page_size: u32,
        inter_request_delay_ms: u64,
    ) -> Result<Self, CatalogError> {
        let snapshot = Self::new();
        for &collection in collections {
            let entries = fetch_all(source, collection, page_size, inter_request_delay_ms).await?;
            snapshot.seed(collection, entries);
        }
        Ok(snapshot)
    }

    /// Current entries of `collection`, in insertion order.
    #[must_use]
    pub fn entries(&self, collection: Collection) -> Vec<Value> {
        self.lock()
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `list_page` calls served for `collection`.
    #[must_use]
    pub fn list_requests(&self, collection: Collection) -> usize {
        self.lock()
            .list_requests
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    /// Number of create, update and delete calls received for `collection`.
    #[must_use]
    pub fn write_requests(&self, collection: Collection) -> usize {
        self.lock().writes.get(&collection).copied().unwrap_or(0)
    }

    /// Make every later write to `collection` fail with `status`.
    pub fn fail_writes(&self, collection: Collection, status: u16) {
        self.lock().failing_writes.insert(collection, status);
    }

    /// Make every later list request on `collection` fail with `status`.
    pub fn fail_lists(&self, collection: Collection, status: u16) {
        self.lock().failing_lists.insert(collection, status);
    }

    fn begin_write(state: &mut State, collection: Collection) -> Result<(), CatalogError> {
        *state.writes.entry(collection).or_default() += 1;
        match state.failing_writes.get(&collection) {
            Some(&status) => Err(status_error(collection, status)),
            None => Ok(()),
        }
    }

    fn check_unique_slug(
        entries: &[Value],
        collection: Collection,
        data: &Value,
        except_id: Option<i64>,
    ) -> Result<(), CatalogError> {
        let Some(slug) = data.get("slug").and_then(Value::as_str) else {
            return Ok(());
        };
        let taken = entries.iter().any(|e| {
            e.get("slug").and_then(Value::as_str) == Some(slug) && entry_id(e) != except_id
        });
        if taken {
            return Err(CatalogError::Conflict {
                collection: collection.to_string(),
                message: "ValidationError: This attribute must be unique".to_owned(),
            });
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    async fn list_page(
        &self,
        collection: Collection,
        page: u32,
        page_size: u32,
    ) -> Result<Page, CatalogError> {
        let mut state = self.lock();
        *state.list_requests.entry(collection).or_default() += 1;
        if let Some(&status) = state.failing_lists.get(&collection) {
            return Err(status_error(collection, status));
        }

        let size = page_size.clamp(1, MAX_PAGE_SIZE);
        let entries = state
            .collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = (page.max(1) as usize - 1) * size as usize;
        let items: Vec<Value> = entries.iter().skip(start).take(size as usize).cloned().collect();
        let total = entries.len() as u64;

        Ok(Page {
            items,
            meta: Some(PageMeta {
                page,
                page_size: size,
                page_count: Some(page_count_for(total, size)),
                total: Some(total),
            }),
        })
    }

    async fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, CatalogError> {
        let state = self.lock();
        Ok(state
            .collections
            .get(&collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| field_matches(e, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Value>, CatalogError> {
        let state = self.lock();
        Ok(state
            .collections
            .get(&collection)
            .and_then(|entries| entries.iter().find(|e| entry_id(e) == Some(id)))
            .cloned())
    }

    async fn create(&self, collection: Collection, data: &Value) -> Result<Value, CatalogError> {
        let mut state = self.lock();
        Self::begin_write(&mut state, collection)?;

        let entries = state
            .collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Self::check_unique_slug(entries, collection, data, None)?;

        state.next_id += 1;
        let id = state.next_id;
        let mut map = data.as_object().cloned().unwrap_or_else(Map::new);
        map.insert("id".to_owned(), Value::from(id));
        let created = Value::Object(map);
        state
            .collections
            .entry(collection)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        data: &Value,
    ) -> Result<Value, CatalogError> {
        let mut state = self.lock();
        Self::begin_write(&mut state, collection)?;

        let entries = state.collections.entry(collection).or_default();
        Self::check_unique_slug(entries, collection, data, Some(id))?;
        let entry = entries
            .iter_mut()
            .find(|e| entry_id(e) == Some(id))
            .ok_or_else(|| CatalogError::NotFound {
                url: format!("memory://{collection}/{id}"),
            })?;
        if let (Value::Object(target), Some(changes)) = (entry, data.as_object()) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(entries
            .iter()
            .find(|e| entry_id(e) == Some(id))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<(), CatalogError> {
        let mut state = self.lock();
        Self::begin_write(&mut state, collection)?;

        let entries = state.collections.entry(collection).or_default();
        let before = entries.len();
        entries.retain(|e| entry_id(e) != Some(id));
        if entries.len() == before {
            return Err(CatalogError::NotFound {
                url: format!("memory://{collection}/{id}"),
            });
        }
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<u64, CatalogError> {
        Ok(self
            .lock()
            .collections
            .get(&collection)
            .map_or(0, |entries| entries.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let catalog = MemoryCatalog::new();
        catalog.seed(Collection::Brands, vec![json!({ "id": 7, "name": "KIA", "slug": "kia" })]);
        let created = catalog
            .create(Collection::Brands, &json!({ "name": "FIAT", "slug": "fiat" }))
            .await
            .unwrap();
        assert_eq!(created["id"], 8);
        assert_eq!(catalog.count(Collection::Brands).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_slug_as_conflict() {
        let catalog = MemoryCatalog::new();
        catalog.seed(Collection::Brands, vec![json!({ "name": "KIA", "slug": "kia" })]);
        let err = catalog
            .create(Collection::Brands, &json!({ "name": "Kia", "slug": "kia" }))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn list_page_reports_page_count() {
        let catalog = MemoryCatalog::new();
        let entries = (0..5).map(|i| json!({ "name": format!("B{i}"), "slug": format!("b{i}") }));
        catalog.seed(Collection::Brands, entries.collect());

        let page = catalog.list_page(Collection::Brands, 3, 2).await.unwrap();
        assert_eq!(page.items.len(), 1);
        let meta = page.meta.unwrap();
        assert_eq!(meta.page_count, Some(3));
        assert_eq!(meta.total, Some(5));
        assert_eq!(catalog.list_requests(Collection::Brands), 1);
    }

    #[tokio::test]
    async fn update_merges_fields_and_delete_removes() {
        let catalog = MemoryCatalog::new();
        catalog.seed(Collection::Models, vec![json!({ "id": 1, "name": "Golf", "slug": "golf" })]);
        let updated = catalog
            .update(Collection::Models, 1, &json!({ "brand": 5 }))
            .await
            .unwrap();
        assert_eq!(updated, json!({ "id": 1, "name": "Golf", "slug": "golf", "brand": 5 }));

        catalog.delete(Collection::Models, 1).await.unwrap();
        assert!(catalog.get(Collection::Models, 1).await.unwrap().is_none());
        assert!(matches!(
            catalog.delete(Collection::Models, 1).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_by_compares_numbers_as_text() {
        let catalog = MemoryCatalog::new();
        catalog.seed(Collection::Models, vec![json!({ "id": 1, "slug": "golf", "brand": 5 })]);
        let found = catalog.find_by(Collection::Models, "brand", "5").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn injected_write_failures_are_counted() {
        let catalog = MemoryCatalog::new();
        catalog.fail_writes(Collection::Brands, 500);
        let err = catalog
            .create(Collection::Brands, &json!({ "slug": "kia" }))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnexpectedStatus { status: 500, .. }));
        assert_eq!(catalog.write_requests(Collection::Brands), 1);
    }
}
