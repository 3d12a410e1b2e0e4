//! Find and remove duplicate catalog models.
//!
//! Separate from reconciliation, which never deletes. Models are duplicates
//! when they share a brand and the same normalized name once the brand prefix
//! is stripped (`VOLKSWAGEN GOLF` and `Golf` under Volkswagen). The lowest id
//! is kept. A duplicate is only deleted when no product of any line points at
//! it; referenced duplicates need a manual relink first.

use std::collections::{BTreeMap, HashSet};

use partsync_catalog::{Catalog, CatalogError, CatalogIndex};
use partsync_core::{normalize_name, strip_brand_prefix, Brand, Collection, Model, Product, ProductLine};
use serde::Serialize;

use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub brand: Option<i64>,
    pub name: String,
    pub kept: i64,
    pub duplicates: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub applied: bool,
    pub groups: Vec<DuplicateGroup>,
    pub deleted: Vec<i64>,
    /// Duplicates left in place because a product references them.
    pub referenced: Vec<i64>,
    pub errors: Vec<String>,
}

/// Group `models` into duplicate sets. Groups are ordered by brand id, then
/// name.
#[must_use]
pub fn find_duplicates(models: &CatalogIndex<Model>, brands: &CatalogIndex<Brand>) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<(Option<i64>, String), Vec<i64>> = BTreeMap::new();
    for model in models.iter() {
        let brand_name = model
            .brand
            .and_then(|id| brands.by_id(id))
            .map_or("", |b| b.name.as_str());
        let name = normalize_name(strip_brand_prefix(&model.name, brand_name));
        groups.entry((model.brand, name)).or_default().push(model.id);
    }

    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((brand, name), mut ids)| {
            ids.sort_unstable();
            let kept = ids.remove(0);
            DuplicateGroup {
                brand,
                name,
                kept,
                duplicates: ids,
            }
        })
        .collect()
}

/// List duplicate models and, with `apply`, delete the unreferenced ones.
///
/// # Errors
///
/// Returns [`ReconcileError::IndexBuild`] if brands, models or any product
/// collection cannot be fetched completely. Nothing is deleted in that case.
/// Individual delete failures are recorded in the report.
pub async fn prune_models<C: Catalog>(
    catalog: &C,
    page_size: u32,
    request_delay_ms: u64,
    apply: bool,
) -> Result<PruneReport, ReconcileError> {
    let index_error = |collection: Collection| {
        move |source: CatalogError| ReconcileError::IndexBuild {
            collection: collection.to_string(),
            source,
        }
    };

    let brands: CatalogIndex<Brand> =
        CatalogIndex::build(catalog, Collection::Brands, page_size, request_delay_ms)
            .await
            .map_err(index_error(Collection::Brands))?;
    let models: CatalogIndex<Model> =
        CatalogIndex::build(catalog, Collection::Models, page_size, request_delay_ms)
            .await
            .map_err(index_error(Collection::Models))?;

    let mut referenced_models = HashSet::new();
    for line in ProductLine::ALL {
        let collection = Collection::Products(line);
        let products: CatalogIndex<Product> =
            CatalogIndex::build(catalog, collection, page_size, request_delay_ms)
                .await
                .map_err(index_error(collection))?;
        referenced_models.extend(products.iter().filter_map(|p| p.model));
    }

    let groups = find_duplicates(&models, &brands);
    let mut report = PruneReport {
        applied: apply,
        ..PruneReport::default()
    };

    for group in &groups {
        for &id in &group.duplicates {
            if referenced_models.contains(&id) {
                tracing::warn!(model_id = id, kept = group.kept, name = %group.name, "duplicate model still referenced by products");
                report.referenced.push(id);
                continue;
            }
            if !apply {
                continue;
            }
            match catalog.delete(Collection::Models, id).await {
                Ok(()) => {
                    tracing::info!(model_id = id, kept = group.kept, "deleted duplicate model");
                    report.deleted.push(id);
                }
                Err(e) => {
                    tracing::warn!(model_id = id, error = %e, "failed to delete duplicate model");
                    report.errors.push(format!("model {id}: {e}"));
                }
            }
        }
    }

    report.groups = groups;
    Ok(report)
}
