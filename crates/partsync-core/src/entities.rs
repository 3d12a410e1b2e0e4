//! Catalog entity types and the payloads used to create them.
//!
//! Entities mirror what the catalog returns; relation fields accept a bare
//! id, a populated object carrying `id`, a `{ "data": … }` wrapper, or null.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::slug::{normalize_name, product_key};

/// Product lines carried by the catalog, one collection each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductLine {
    Lights,
    Wipers,
    Battery,
    Filter,
}

impl ProductLine {
    pub const ALL: [ProductLine; 4] = [
        ProductLine::Lights,
        ProductLine::Wipers,
        ProductLine::Battery,
        ProductLine::Filter,
    ];
}

impl std::fmt::Display for ProductLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductLine::Lights => write!(f, "lights"),
            ProductLine::Wipers => write!(f, "wipers"),
            ProductLine::Battery => write!(f, "battery"),
            ProductLine::Filter => write!(f, "filter"),
        }
    }
}

/// A typed catalog collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Brands,
    Models,
    Positions,
    Products(ProductLine),
}

impl Collection {
    /// Path segment of the collection in the catalog API.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Collection::Brands => "brands",
            Collection::Models => "models",
            Collection::Positions => "positions",
            Collection::Products(ProductLine::Lights) => "lights-products",
            Collection::Products(ProductLine::Wipers) => "wipers-products",
            Collection::Products(ProductLine::Battery) => "battery-products",
            Collection::Products(ProductLine::Filter) => "filter-products",
        }
    }

    /// Relation fields the catalog omits from responses unless they are
    /// asked for with `populate`.
    #[must_use]
    pub fn relations(self) -> &'static [&'static str] {
        match self {
            Collection::Models => &["brand"],
            Collection::Products(_) => &["brand", "model", "position"],
            Collection::Brands | Collection::Positions => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Common surface the index builder needs from every catalog entity.
pub trait CatalogEntity: DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> i64;

    /// Primary match key: the slug, or the `(ref, model, position)` key for
    /// products.
    fn match_key(&self) -> String;

    /// Secondary match key: the normalized display name, scoped where the
    /// entity's uniqueness is scoped (models by brand, positions by category).
    fn name_key(&self) -> String;

    /// Human-readable `name [slug]` label for logs and reports.
    fn label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CatalogEntity for Brand {
    fn id(&self) -> i64 {
        self.id
    }

    fn match_key(&self) -> String {
        self.slug.clone()
    }

    fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.name, self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "relation_id")]
    pub brand: Option<i64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Name key of a model within its brand scope.
#[must_use]
pub fn model_name_key(brand_id: Option<i64>, name: &str) -> String {
    format!(
        "{}:{}",
        brand_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        normalize_name(name)
    )
}

impl CatalogEntity for Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn match_key(&self) -> String {
        self.slug.clone()
    }

    fn name_key(&self) -> String {
        model_name_key(self.brand, &self.name)
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.name, self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Name key of a position within its category.
#[must_use]
pub fn position_name_key(category: &str, name: &str) -> String {
    format!("{}:{}", normalize_name(category), normalize_name(name))
}

impl CatalogEntity for Position {
    fn id(&self) -> i64 {
        self.id
    }

    fn match_key(&self) -> String {
        self.slug.clone()
    }

    fn name_key(&self) -> String {
        position_name_key(&self.category, &self.name)
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.name, self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "relation_id")]
    pub brand: Option<i64>,
    #[serde(default, deserialize_with = "relation_id")]
    pub model: Option<i64>,
    #[serde(default, deserialize_with = "relation_id")]
    pub position: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CatalogEntity for Product {
    fn id(&self) -> i64 {
        self.id
    }

    fn match_key(&self) -> String {
        product_key(&self.reference, self.model, self.position)
    }

    fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.name, self.reference)
    }
}

// ---------------------------------------------------------------------------
// Create payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBrand {
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModel {
    pub name: String,
    pub slug: String,
    pub brand: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosition {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(rename = "ref")]
    pub reference: String,
    pub name: String,
    pub brand: i64,
    pub model: i64,
    pub position: i64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Relation {
    Id(i64),
    Object { id: i64 },
    Wrapped { data: Option<Box<Relation>> },
}

impl Relation {
    fn into_id(self) -> Option<i64> {
        match self {
            Relation::Id(id) | Relation::Object { id } => Some(id),
            Relation::Wrapped { data } => data.and_then(|r| r.into_id()),
        }
    }
}

fn relation_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Relation>::deserialize(deserializer)?.and_then(Relation::into_id))
}

/// Accepts `YYYY-MM-DD` or a full timestamp whose first ten characters are
/// a date; anything unparsable decodes as `None`.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        s.get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }))
}
