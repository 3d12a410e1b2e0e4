//! In-memory lookup tables over one catalog collection.

use std::collections::HashMap;

use partsync_core::{CatalogEntity, Collection};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::fetch_all::fetch_all;

/// Every entity of one collection, indexed by match key (slug, or the
/// product identity key) and by scoped normalized name.
///
/// When two catalog entries share a key, the first one fetched wins and the
/// collision is counted; the reconciler never sees the later entry through
/// that key.
#[derive(Debug, Clone)]
pub struct CatalogIndex<T> {
    items: Vec<T>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
    key_collisions: usize,
}

impl<T> Default for CatalogIndex<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            key_collisions: 0,
        }
    }
}

impl<T: CatalogEntity> CatalogIndex<T> {
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        let mut index = Self::default();
        for item in items {
            index.insert(item);
        }
        index
    }

    /// Fetch every page of `collection` and index it.
    ///
    /// # Errors
    ///
    /// Returns the first page error, or [`CatalogError::Deserialize`] if any
    /// entry does not decode as `T`. A partial index is never returned.
    pub async fn build<C: Catalog>(
        catalog: &C,
        collection: Collection,
        page_size: u32,
        inter_request_delay_ms: u64,
    ) -> Result<Self, CatalogError> {
        let raw = fetch_all(catalog, collection, page_size, inter_request_delay_ms).await?;
        let items = raw
            .into_iter()
            .map(|entry| decode_entry::<T>(entry, collection))
            .collect::<Result<Vec<T>, _>>()?;
        let index = Self::from_items(items);
        tracing::info!(
            collection = %collection,
            entries = index.len(),
            key_collisions = index.key_collisions,
            "catalog index built"
        );
        Ok(index)
    }

    /// Add an entity, typically one created during this run.
    pub fn insert(&mut self, item: T) {
        let pos = self.items.len();
        let key = item.match_key();
        let name = item.name_key();

        if self.by_key.contains_key(&key) {
            self.key_collisions += 1;
            tracing::warn!(key = %key, entity = %item.label(), "duplicate catalog key; first entry wins");
        } else {
            self.by_key.insert(key, pos);
        }
        self.by_name.entry(name).or_insert(pos);
        self.by_id.entry(item.id()).or_insert(pos);
        self.items.push(item);
    }

    /// Replace the entity with the same id, or add it if there is none.
    ///
    /// Keys of the replaced entity stay in place; new keys are added.
    pub fn upsert(&mut self, item: T) {
        let Some(&pos) = self.by_id.get(&item.id()) else {
            self.insert(item);
            return;
        };
        self.by_key.entry(item.match_key()).or_insert(pos);
        self.by_name.entry(item.name_key()).or_insert(pos);
        self.items[pos] = item;
    }

    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&T> {
        self.by_key.get(key).map(|&i| &self.items[i])
    }

    #[must_use]
    pub fn by_name(&self, name_key: &str) -> Option<&T> {
        self.by_name.get(name_key).map(|&i| &self.items[i])
    }

    #[must_use]
    pub fn by_id(&self, id: i64) -> Option<&T> {
        self.by_id.get(&id).map(|&i| &self.items[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries whose match key was already taken by an earlier entry.
    #[must_use]
    pub fn key_collisions(&self) -> usize {
        self.key_collisions
    }
}

/// Decode one raw catalog entry as `T`.
///
/// # Errors
///
/// Returns [`CatalogError::Deserialize`] naming the collection and entry id.
pub fn decode_entry<T: CatalogEntity>(entry: Value, collection: Collection) -> Result<T, CatalogError> {
    let id = entry.get("id").and_then(Value::as_i64);
    serde_json::from_value(entry).map_err(|e| CatalogError::Deserialize {
        context: format!(
            "{collection} entry {}",
            id.map_or_else(|| "without id".to_owned(), |id| id.to_string())
        ),
        source: e,
    })
}
