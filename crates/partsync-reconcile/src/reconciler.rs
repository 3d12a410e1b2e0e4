//! Join source records against catalog indices and stage actions.
//!
//! Planning is pure: the reconciler reads indices and returns a [`TierPlan`].
//! The pipeline applies the plan and inserts created entities into the index
//! before planning the next tier.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use partsync_catalog::CatalogIndex;
use partsync_core::{
    model_name_key, normalize_name, position_name_key, product_key, slugify, strip_brand_prefix,
    AliasTable, Brand, CatalogEntity, Model, NewBrand, NewModel, NewPosition, NewProduct, Position, Product,
    ProductLine,
};
use partsync_source::{BrandRecord, ModelRecord, ProductRecord};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::action::{Action, Tier};
use crate::suggest::{suggest, Suggestion};

/// A model to reconcile. `brand` is a brand slug or display name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub name: String,
    pub brand: String,
    pub slug: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<&ModelRecord> for ModelInput {
    fn from(record: &ModelRecord) -> Self {
        Self {
            name: record.name.clone(),
            brand: record.brand_slug.clone(),
            slug: record.model_slug.clone(),
            start_date: record.start_date,
            end_date: record.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInput {
    pub name: String,
    pub category: String,
    /// `None` leaves an existing position's order untouched.
    pub sort_order: Option<i32>,
}

/// A product to reconcile. `brand`, `model` and `position` are display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub reference: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub position: String,
    pub category: String,
    pub line: ProductLine,
    pub description: Option<String>,
    pub direction: Option<String>,
}

impl From<&ProductRecord> for ProductInput {
    fn from(record: &ProductRecord) -> Self {
        Self {
            reference: record.reference.clone(),
            name: format!("{} {}", record.brand, record.model),
            brand: record.brand.clone(),
            model: record.model.clone(),
            position: record.position.clone(),
            category: record.category.clone(),
            line: record.line,
            description: record.description.clone(),
            direction: None,
        }
    }
}

/// Two distinct source names that produced the same slug. The first one is
/// staged; the second is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlugCollision {
    pub tier: Tier,
    pub slug: String,
    pub kept: String,
    pub skipped: String,
}

/// Staged actions for one tier, plus what the report needs from planning.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPlan {
    pub tier: Tier,
    pub actions: Vec<Action>,
    pub collisions: Vec<SlugCollision>,
    pub suggestions: Vec<Suggestion>,
}

impl TierPlan {
    fn new(tier: Tier) -> Self {
        Self {
            tier,
            actions: Vec::new(),
            collisions: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Number of actions that would send a request.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_write()).count()
    }

    fn create(&mut self, label: String, payload: &impl Serialize) {
        let action = match serde_json::to_value(payload) {
            Ok(payload) => Action::Create { label, payload },
            Err(e) => Action::Reject {
                label,
                reason: format!("cannot encode payload: {e}"),
            },
        };
        self.actions.push(action);
    }

    fn skip(&mut self, label: String, reason: impl Into<String>) {
        self.actions.push(Action::Skip {
            label,
            reason: reason.into(),
        });
    }

    fn reject(&mut self, label: String, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(tier = %self.tier, entity = %label, reason = %reason, "record rejected");
        self.actions.push(Action::Reject { label, reason });
    }

    fn update_or_skip(&mut self, label: String, id: i64, changes: Map<String, Value>, touched: &mut HashSet<i64>) {
        if changes.is_empty() {
            self.skip(label, "already exists");
        } else if !touched.insert(id) {
            self.skip(label, "already updated in this run");
        } else {
            self.actions.push(Action::Update {
                label,
                id,
                changes: Value::Object(changes),
            });
        }
    }
}

/// Keys staged for creation in the current tier. Each key remembers the
/// identity and display name of the record that claimed it first.
#[derive(Default)]
struct Staged {
    keys: HashMap<String, (String, String)>,
}

enum Claim {
    New,
    Duplicate,
    Collision(String),
}

impl Staged {
    fn claim(&mut self, key: &str, identity: &str, display: &str) -> Claim {
        match self.keys.get(key) {
            None => {
                self.keys
                    .insert(key.to_owned(), (identity.to_owned(), display.to_owned()));
                Claim::New
            }
            Some((first, _)) if first == identity => Claim::Duplicate,
            Some((_, kept)) => Claim::Collision(kept.clone()),
        }
    }
}

/// Collects at most one suggestion per `(tier, source)`.
#[derive(Default)]
struct SuggestionSink {
    seen: HashSet<(Tier, String)>,
}

impl SuggestionSink {
    fn offer<'a, I>(&mut self, plan: &mut TierPlan, tier: Tier, source: &str, candidates: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if !self.seen.insert((tier, normalize_name(source))) {
            return;
        }
        let candidates = suggest(source, candidates);
        if !candidates.is_empty() {
            plan.suggestions.push(Suggestion {
                tier,
                source: source.to_owned(),
                candidates,
            });
        }
    }
}

fn label(name: &str, key: &str) -> String {
    format!("{name} [{key}]")
}

fn brand_candidates(brands: &CatalogIndex<Brand>) -> impl Iterator<Item = (&str, &str)> {
    brands.iter().map(|b| (b.name.as_str(), b.slug.as_str()))
}

pub struct Reconciler<'a> {
    aliases: &'a AliasTable,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    /// Find the catalog brand for a source slug or name.
    ///
    /// Order: exact slug, exact normalized name, then the alias table.
    #[must_use]
    pub fn resolve_brand<'i>(&self, brands: &'i CatalogIndex<Brand>, raw: &str) -> Option<&'i Brand> {
        brands
            .by_key(&slugify(raw))
            .or_else(|| brands.by_name(&normalize_name(raw)))
            .or_else(|| {
                let canonical = self.aliases.resolve(raw)?;
                brands
                    .by_name(&normalize_name(canonical))
                    .or_else(|| brands.by_key(&slugify(canonical)))
            })
    }

    #[must_use]
    pub fn plan_brands(&self, records: &[BrandRecord], brands: &CatalogIndex<Brand>) -> TierPlan {
        let mut plan = TierPlan::new(Tier::Brands);
        let mut staged = Staged::default();
        let mut sink = SuggestionSink::default();

        for record in records {
            // An alias names the canonical spelling; create under that name.
            let name = self
                .aliases
                .resolve(&record.name)
                .unwrap_or(record.name.trim())
                .to_owned();
            let slug = slugify(&name);
            let entity = label(&name, &slug);

            if slug.is_empty() {
                plan.reject(entity, "name has no slug characters");
                continue;
            }
            if self.resolve_brand(brands, &record.name).is_some() {
                plan.skip(entity, "already exists");
                continue;
            }
            match staged.claim(&slug, &normalize_name(&name), &name) {
                Claim::New => {}
                Claim::Duplicate => {
                    plan.skip(entity, "duplicate source record");
                    continue;
                }
                Claim::Collision(kept) => {
                    tracing::warn!(slug = %slug, kept = %kept, skipped = %name, "slug collision");
                    plan.collisions.push(SlugCollision {
                        tier: Tier::Brands,
                        slug: slug.clone(),
                        kept: kept.clone(),
                        skipped: name.clone(),
                    });
                    plan.skip(entity, format!("slug collides with '{kept}'"));
                    continue;
                }
            }

            sink.offer(&mut plan, Tier::Brands, &record.name, brand_candidates(brands));
            plan.create(
                entity,
                &NewBrand {
                    name,
                    slug,
                    is_active: record.active,
                },
            );
        }
        plan
    }

    #[must_use]
    pub fn plan_models(
        &self,
        records: &[ModelInput],
        brands: &CatalogIndex<Brand>,
        models: &CatalogIndex<Model>,
    ) -> TierPlan {
        let mut plan = TierPlan::new(Tier::Models);
        let mut staged = Staged::default();
        let mut staged_brands: HashMap<String, i64> = HashMap::new();
        let mut touched = HashSet::new();
        let mut sink = SuggestionSink::default();

        for input in records {
            let name = input.name.trim();
            let slug = input
                .slug
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or_else(|| slugify(name), str::to_owned);

            let Some(brand) = self.resolve_brand(brands, &input.brand) else {
                sink.offer(&mut plan, Tier::Brands, &input.brand, brand_candidates(brands));
                plan.reject(label(name, &slug), format!("brand '{}' not found", input.brand));
                continue;
            };
            if slug.is_empty() {
                plan.reject(label(name, &slug), "name has no slug characters");
                continue;
            }

            // A slug held by another brand's model moves under this brand's
            // slug (`abarth-500` next to Fiat's `500`).
            let taken_by_other_brand = models
                .by_key(&slug)
                .is_some_and(|m| m.brand.is_some_and(|b| b != brand.id))
                || staged_brands.get(&slug).is_some_and(|b| *b != brand.id);
            let slug = if taken_by_other_brand {
                format!("{}-{slug}", brand.slug)
            } else {
                slug
            };
            let entity = label(name, &slug);

            let existing = match models.by_key(&slug) {
                Some(model) if model.brand.is_some_and(|b| b != brand.id) => {
                    plan.reject(
                        entity,
                        format!(
                            "slug '{slug}' belongs to a model of another brand (id {})",
                            model.brand.unwrap_or_default()
                        ),
                    );
                    continue;
                }
                Some(model) => Some(model),
                None => models.by_name(&model_name_key(Some(brand.id), name)),
            };

            // Only a missing brand link is repaired; dates already in the
            // catalog, or absent from it, are left as they are.
            if let Some(model) = existing {
                let mut changes = Map::new();
                if model.brand.is_none() {
                    changes.insert("brand".to_owned(), Value::from(brand.id));
                }
                plan.update_or_skip(label(&model.name, &model.slug), model.id, changes, &mut touched);
                continue;
            }

            let name_key = model_name_key(Some(brand.id), name);
            match staged.claim(&slug, &name_key, name) {
                Claim::New => {}
                Claim::Duplicate => {
                    plan.skip(entity, "duplicate source record");
                    continue;
                }
                Claim::Collision(kept) => {
                    tracing::warn!(slug = %slug, kept = %kept, skipped = %name, "slug collision");
                    plan.collisions.push(SlugCollision {
                        tier: Tier::Models,
                        slug: slug.clone(),
                        kept: kept.clone(),
                        skipped: name.to_owned(),
                    });
                    plan.skip(entity, format!("slug collides with '{kept}'"));
                    continue;
                }
            }
            // Same name under the same brand is one model, whatever its slug.
            if matches!(staged.claim(&name_key, &name_key, name), Claim::Duplicate) {
                plan.skip(entity, "duplicate source record");
                continue;
            }
            staged_brands.insert(slug.clone(), brand.id);

            sink.offer(
                &mut plan,
                Tier::Models,
                name,
                models
                    .iter()
                    .filter(|m| m.brand == Some(brand.id))
                    .map(|m| (m.name.as_str(), m.slug.as_str())),
            );
            plan.create(
                entity,
                &NewModel {
                    name: name.to_owned(),
                    slug,
                    brand: brand.id,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    is_active: true,
                },
            );
        }
        plan
    }

    #[must_use]
    pub fn plan_positions(&self, records: &[PositionInput], positions: &CatalogIndex<Position>) -> TierPlan {
        let mut plan = TierPlan::new(Tier::Positions);
        let mut staged = Staged::default();
        let mut staged_categories: HashMap<String, String> = HashMap::new();
        let mut touched = HashSet::new();

        for input in records {
            let name = input.name.trim();
            let category = normalize_name(&input.category);
            let base_slug = slugify(name);
            if base_slug.is_empty() {
                plan.reject(label(name, &base_slug), "name has no slug characters");
                continue;
            }

            if let Some(position) = Self::resolve_position(positions, name, &input.category) {
                let mut changes = Map::new();
                if let Some(order) = input.sort_order.filter(|o| *o != position.sort_order) {
                    changes.insert("sortOrder".to_owned(), Value::from(order));
                }
                plan.update_or_skip(label(&position.name, &position.slug), position.id, changes, &mut touched);
                continue;
            }

            // The same name in another category gets a category-scoped slug.
            let slug = if positions.by_key(&base_slug).is_some()
                || staged_categories.get(&base_slug).is_some_and(|c| *c != category)
            {
                slugify(&format!("{name} {}", input.category))
            } else {
                base_slug
            };
            let entity = label(name, &slug);

            match staged.claim(&slug, &position_name_key(&input.category, name), name) {
                Claim::New => {}
                Claim::Duplicate => {
                    plan.skip(entity, "duplicate source record");
                    continue;
                }
                Claim::Collision(kept) => {
                    plan.collisions.push(SlugCollision {
                        tier: Tier::Positions,
                        slug: slug.clone(),
                        kept: kept.clone(),
                        skipped: name.to_owned(),
                    });
                    plan.skip(entity, format!("slug collides with '{kept}'"));
                    continue;
                }
            }
            staged_categories.insert(slug.clone(), category);

            plan.create(
                entity,
                &NewPosition {
                    name: name.to_owned(),
                    slug,
                    category: input.category.clone(),
                    sort_order: input.sort_order.unwrap_or(0),
                },
            );
        }
        plan
    }

    /// A position is identified by name within its category; slugs are only
    /// a fallback and must carry the same category.
    fn resolve_position<'i>(
        positions: &'i CatalogIndex<Position>,
        name: &str,
        category: &str,
    ) -> Option<&'i Position> {
        let wanted = normalize_name(category);
        let same_category = |p: &&Position| normalize_name(&p.category) == wanted;
        positions
            .by_name(&position_name_key(category, name))
            .or_else(|| positions.by_key(&slugify(name)).filter(same_category))
            .or_else(|| {
                positions
                    .by_key(&slugify(&format!("{name} {category}")))
                    .filter(same_category)
            })
    }

    fn resolve_model<'i>(
        models: &'i CatalogIndex<Model>,
        brand: &Brand,
        raw: &str,
    ) -> Option<&'i Model> {
        let stripped = strip_brand_prefix(raw, &brand.name);
        models
            .by_name(&model_name_key(Some(brand.id), stripped))
            .or_else(|| models.by_name(&model_name_key(Some(brand.id), raw)))
            .or_else(|| {
                models
                    .by_key(&slugify(stripped))
                    .filter(|m| m.brand == Some(brand.id))
            })
    }

    #[must_use]
    pub fn plan_products(
        &self,
        records: &[ProductInput],
        brands: &CatalogIndex<Brand>,
        models: &CatalogIndex<Model>,
        positions: &CatalogIndex<Position>,
        products: &CatalogIndex<Product>,
    ) -> TierPlan {
        let mut plan = TierPlan::new(Tier::Products);
        let mut staged = Staged::default();
        let mut touched = HashSet::new();
        let mut sink = SuggestionSink::default();

        for input in records {
            let reference = input.reference.trim();
            let entity = label(&input.name, reference);

            let Some(brand) = self.resolve_brand(brands, &input.brand) else {
                sink.offer(&mut plan, Tier::Brands, &input.brand, brand_candidates(brands));
                plan.reject(entity, format!("brand '{}' not found", input.brand));
                continue;
            };
            let Some(model) = Self::resolve_model(models, brand, &input.model) else {
                sink.offer(
                    &mut plan,
                    Tier::Models,
                    &input.model,
                    models
                        .iter()
                        .filter(|m| m.brand == Some(brand.id))
                        .map(|m| (m.name.as_str(), m.slug.as_str())),
                );
                plan.reject(
                    entity,
                    format!("model '{}' not found for brand '{}'", input.model, brand.name),
                );
                continue;
            };
            let Some(position) = Self::resolve_position(positions, input.position.trim(), &input.category)
            else {
                plan.reject(entity, format!("position '{}' not found", input.position));
                continue;
            };

            let key = product_key(reference, Some(model.id), Some(position.id));
            if let Some(product) = products.by_key(&key) {
                let mut changes = Map::new();
                if product.brand.is_none() {
                    changes.insert("brand".to_owned(), Value::from(brand.id));
                }
                if product.category.as_deref() != Some(input.category.as_str()) {
                    changes.insert("category".to_owned(), Value::from(input.category.clone()));
                }
                plan.update_or_skip(product.label(), product.id, changes, &mut touched);
                continue;
            }

            if !matches!(staged.claim(&key, &key, reference), Claim::New) {
                plan.skip(entity, "duplicate source record");
                continue;
            }

            plan.create(
                entity,
                &NewProduct {
                    reference: reference.to_owned(),
                    name: input.name.clone(),
                    brand: brand.id,
                    model: model.id,
                    position: position.id,
                    category: input.category.clone(),
                    description: input.description.clone(),
                    direction: input.direction.clone(),
                    is_active: true,
                },
            );
        }
        plan
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
