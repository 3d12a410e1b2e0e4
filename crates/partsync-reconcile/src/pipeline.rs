//! Tier-by-tier import: index, plan, apply, fold created entities back in.
//!
//! A tier whose index cannot be built is aborted along with every tier that
//! depends on it. A partial index is never used to decide creates.

use std::collections::HashSet;

use partsync_catalog::{decode_entry, Catalog, CatalogIndex};
use partsync_core::{
    normalize_name, strip_brand_prefix, AliasTable, AppConfig, Brand, CatalogEntity, Collection,
    Model, Position, ProductLine,
};
use partsync_source::{BrandRecord, ProductRecord, SourceBatch, WiperSlot, WiperVehicle};

use crate::action::{Outcome, Tier};
use crate::dedup::{consolidate_variants, dedup_positions, flatten_positions};
use crate::error::ReconcileError;
use crate::executor::{execute, ExecutorConfig};
use crate::reconciler::{ModelInput, PositionInput, ProductInput, Reconciler, TierPlan};
use crate::report::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub page_size: u32,
    /// Pause between page requests while building indices.
    pub request_delay_ms: u64,
    pub executor: ExecutorConfig,
    /// Recorded in the report; the caller picks the catalog.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            request_delay_ms: 0,
            executor: ExecutorConfig::default(),
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_config(config: &AppConfig, dry_run: bool) -> Self {
        Self {
            page_size: config.page_size,
            request_delay_ms: config.batch_delay_ms,
            executor: ExecutorConfig::from_config(config),
            dry_run,
        }
    }
}

/// Collections a run over `batch` reads or writes.
#[must_use]
pub fn collections_for(batch: &SourceBatch) -> Vec<Collection> {
    match batch {
        SourceBatch::Brands(_) => vec![Collection::Brands],
        SourceBatch::Models(_) => vec![Collection::Brands, Collection::Models],
        SourceBatch::Products(loaded) => {
            let mut collections = vec![Collection::Brands, Collection::Models, Collection::Positions];
            collections.extend(
                ProductLine::ALL
                    .into_iter()
                    .filter(|line| loaded.records.iter().any(|r| r.line == *line))
                    .map(Collection::Products),
            );
            collections
        }
        SourceBatch::Wipers(_) => vec![
            Collection::Brands,
            Collection::Models,
            Collection::Positions,
            Collection::Products(ProductLine::Wipers),
        ],
    }
}

/// Model name of a wipers row without the leading brand name.
#[must_use]
pub fn wiper_model_name(vehicle: &WiperVehicle) -> String {
    strip_brand_prefix(&vehicle.model, &vehicle.brand).to_owned()
}

/// The eight wiper positions every wipers import relies on.
#[must_use]
pub fn wiper_positions() -> Vec<PositionInput> {
    WiperSlot::ALL
        .into_iter()
        .map(|slot| PositionInput {
            name: slot.position_name().to_owned(),
            category: slot.category().to_owned(),
            sort_order: Some(slot.sort_order()),
        })
        .collect()
}

pub struct Pipeline<'a, C> {
    catalog: &'a C,
    reconciler: Reconciler<'a>,
    config: PipelineConfig,
}

impl<'a, C: Catalog> Pipeline<'a, C> {
    #[must_use]
    pub fn new(catalog: &'a C, aliases: &'a AliasTable, config: PipelineConfig) -> Self {
        Self {
            catalog,
            reconciler: Reconciler::new(aliases),
            config,
        }
    }

    /// Reconcile a loaded source file and return the report.
    pub async fn run(&self, source: impl Into<String>, batch: SourceBatch) -> RunReport {
        let mut report = RunReport::new(source, self.config.dry_run);
        report.dropped_rows = batch.dropped().to_vec();
        match batch {
            SourceBatch::Brands(loaded) => {
                self.import_brands(&loaded.records, &mut report).await;
            }
            SourceBatch::Models(loaded) => {
                let inputs: Vec<ModelInput> = loaded.records.iter().map(ModelInput::from).collect();
                self.import_models(&inputs, &mut report).await;
            }
            SourceBatch::Products(loaded) => {
                self.import_products(&loaded.records, &mut report).await;
            }
            SourceBatch::Wipers(loaded) => {
                self.import_wipers(loaded.records, &mut report).await;
            }
        }
        let totals = report.totals();
        tracing::info!(
            created = totals.created,
            updated = totals.updated,
            skipped = totals.skipped,
            errors = totals.errors,
            aborted = report.aborted(),
            "import finished"
        );
        report
    }

    pub async fn import_brands(&self, records: &[BrandRecord], report: &mut RunReport) {
        self.brands_tier(records, report).await;
    }

    pub async fn import_models(&self, inputs: &[ModelInput], report: &mut RunReport) {
        let Some(brands) = self.index_for::<Brand>(Tier::Models, Collection::Brands, report).await else {
            return;
        };
        self.models_tier(inputs, &brands, report).await;
    }

    /// Products need their brands and models to exist already. Missing
    /// positions are created first.
    pub async fn import_products(&self, records: &[ProductRecord], report: &mut RunReport) {
        let mut seen = HashSet::new();
        let position_inputs: Vec<PositionInput> = records
            .iter()
            .filter(|r| seen.insert((normalize_name(&r.category), normalize_name(&r.position))))
            .map(|r| PositionInput {
                name: r.position.clone(),
                category: r.category.clone(),
                sort_order: None,
            })
            .collect();
        let positions = self.positions_tier(&position_inputs, report).await;

        let lines: Vec<ProductLine> = ProductLine::ALL
            .into_iter()
            .filter(|line| records.iter().any(|r| r.line == *line))
            .collect();
        let brands = self.index_for::<Brand>(Tier::Products, Collection::Brands, report).await;
        let models = if brands.is_some() {
            self.index_for::<Model>(Tier::Products, Collection::Models, report).await
        } else {
            None
        };
        let (Some(brands), Some(models), Some(positions)) = (brands, models, positions) else {
            if !report.is_aborted(Tier::Products) {
                for line in lines {
                    Self::blocked(Tier::Products, Collection::Products(line), report);
                }
            }
            return;
        };

        for line in lines {
            let inputs: Vec<ProductInput> = records
                .iter()
                .filter(|r| r.line == line)
                .map(ProductInput::from)
                .collect();
            self.products_tier(&inputs, line, &brands, &models, &positions, report)
                .await;
        }
    }

    /// Consolidate drive variants, then walk every tier for the wipers line.
    pub async fn import_wipers(&self, vehicles: Vec<WiperVehicle>, report: &mut RunReport) {
        let (vehicles, consolidated) = consolidate_variants(vehicles);
        report.consolidated = consolidated;

        let mut seen = HashSet::new();
        let brand_records: Vec<BrandRecord> = vehicles
            .iter()
            .filter(|v| seen.insert(normalize_name(&v.brand)))
            .map(|v| BrandRecord {
                name: v.brand.clone(),
                active: true,
            })
            .collect();
        let brands = self.brands_tier(&brand_records, report).await;

        let mut seen = HashSet::new();
        let model_inputs: Vec<ModelInput> = vehicles
            .iter()
            .map(|v| ModelInput {
                name: wiper_model_name(v),
                brand: v.brand.clone(),
                slug: None,
                start_date: v.start_date,
                end_date: v.end_date,
            })
            .filter(|m| seen.insert((normalize_name(&m.brand), normalize_name(&m.name))))
            .collect();
        let models = match &brands {
            Some(brands) => self.models_tier(&model_inputs, brands, report).await,
            None => {
                Self::blocked(Tier::Models, Collection::Models, report);
                None
            }
        };

        let positions = self.positions_tier(&wiper_positions(), report).await;

        let collection = Collection::Products(ProductLine::Wipers);
        let (Some(brands), Some(models), Some(positions)) = (brands, models, positions) else {
            Self::blocked(Tier::Products, collection, report);
            return;
        };

        let (entries, deduplicated) = dedup_positions(flatten_positions(&vehicles));
        report.deduplicated = deduplicated;
        let inputs: Vec<ProductInput> = entries
            .into_iter()
            .filter_map(|entry| {
                let reference = entry.reference?;
                let model = strip_brand_prefix(&entry.model, &entry.brand).to_owned();
                Some(ProductInput {
                    reference,
                    name: format!("{} {model} - Wipers", entry.brand),
                    brand: entry.brand,
                    model,
                    position: entry.slot.position_name().to_owned(),
                    category: entry.slot.category().to_owned(),
                    line: ProductLine::Wipers,
                    description: entry.notes,
                    direction: Some(entry.direction).filter(|d| !d.is_empty()),
                })
            })
            .collect();
        self.products_tier(&inputs, ProductLine::Wipers, &brands, &models, &positions, report)
            .await;
    }

    async fn brands_tier(
        &self,
        records: &[BrandRecord],
        report: &mut RunReport,
    ) -> Option<CatalogIndex<Brand>> {
        let mut brands = self.index_for::<Brand>(Tier::Brands, Collection::Brands, report).await?;
        let plan = self.reconciler.plan_brands(records, &brands);
        self.apply(plan, Collection::Brands, &mut brands, report).await;
        Some(brands)
    }

    async fn models_tier(
        &self,
        inputs: &[ModelInput],
        brands: &CatalogIndex<Brand>,
        report: &mut RunReport,
    ) -> Option<CatalogIndex<Model>> {
        if Self::blocked(Tier::Models, Collection::Models, report) {
            return None;
        }
        let mut models = self.index_for::<Model>(Tier::Models, Collection::Models, report).await?;
        let plan = self.reconciler.plan_models(inputs, brands, &models);
        self.apply(plan, Collection::Models, &mut models, report).await;
        Some(models)
    }

    async fn positions_tier(
        &self,
        inputs: &[PositionInput],
        report: &mut RunReport,
    ) -> Option<CatalogIndex<Position>> {
        let mut positions = self
            .index_for::<Position>(Tier::Positions, Collection::Positions, report)
            .await?;
        let plan = self.reconciler.plan_positions(inputs, &positions);
        self.apply(plan, Collection::Positions, &mut positions, report).await;
        Some(positions)
    }

    async fn products_tier(
        &self,
        inputs: &[ProductInput],
        line: ProductLine,
        brands: &CatalogIndex<Brand>,
        models: &CatalogIndex<Model>,
        positions: &CatalogIndex<Position>,
        report: &mut RunReport,
    ) {
        let collection = Collection::Products(line);
        if Self::blocked(Tier::Products, collection, report) {
            return;
        }
        let Some(mut products) = self.index_for(Tier::Products, collection, report).await else {
            return;
        };
        let plan = self
            .reconciler
            .plan_products(inputs, brands, models, positions, &products);
        self.apply(plan, collection, &mut products, report).await;
    }

    /// Abort `tier` when a tier it depends on was aborted.
    fn blocked(tier: Tier, collection: Collection, report: &mut RunReport) -> bool {
        let Some(dep) = tier.depends_on().iter().find(|dep| report.is_aborted(**dep)) else {
            return false;
        };
        report.abort_tier(tier, collection.to_string(), format!("{dep} tier was aborted"));
        true
    }

    async fn index_for<T: CatalogEntity>(
        &self,
        tier: Tier,
        collection: Collection,
        report: &mut RunReport,
    ) -> Option<CatalogIndex<T>> {
        match self.build_index(collection).await {
            Ok(index) => Some(index),
            Err(e) => {
                report.abort_tier(tier, collection.to_string(), e.to_string());
                None
            }
        }
    }

    async fn build_index<T: CatalogEntity>(
        &self,
        collection: Collection,
    ) -> Result<CatalogIndex<T>, ReconcileError> {
        CatalogIndex::build(
            self.catalog,
            collection,
            self.config.page_size,
            self.config.request_delay_ms,
        )
        .await
        .map_err(|source| ReconcileError::IndexBuild {
            collection: collection.to_string(),
            source,
        })
    }

    async fn apply<T: CatalogEntity>(
        &self,
        plan: TierPlan,
        collection: Collection,
        index: &mut CatalogIndex<T>,
        report: &mut RunReport,
    ) {
        let tier = plan.tier;
        report.slug_collisions.extend(plan.collisions);
        report.suggestions.extend(plan.suggestions);

        let run = execute(self.catalog, collection, plan.actions, &self.config.executor).await;
        for outcome in &run.outcomes {
            let (Outcome::Created { entry, label } | Outcome::Updated { entry, label, .. }) = outcome else {
                continue;
            };
            match decode_entry::<T>(entry.clone(), collection) {
                Ok(item) => index.upsert(item),
                Err(e) => {
                    tracing::warn!(collection = %collection, entity = %label, error = %e, "written entry not indexed");
                }
            }
        }
        report.record_tier(tier, collection.to_string(), &run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiper_positions_cover_every_slot_in_order() {
        let positions = wiper_positions();
        assert_eq!(positions.len(), 8);
        assert_eq!(positions[0].name, "Kit Avant");
        assert_eq!(positions[0].sort_order, Some(1));
        assert_eq!(positions[7].name, "Arrière");
        assert_eq!(positions[7].category, "arriere");
    }

    #[test]
    fn wipers_touch_every_tier_collection() {
        let batch = SourceBatch::Wipers(partsync_source::Loaded {
            records: Vec::new(),
            dropped: Vec::new(),
        });
        assert_eq!(
            collections_for(&batch),
            vec![
                Collection::Brands,
                Collection::Models,
                Collection::Positions,
                Collection::Products(ProductLine::Wipers),
            ]
        );
    }
}
