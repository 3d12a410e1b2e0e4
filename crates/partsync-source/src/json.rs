//! Loaders for the JSON extracts (brands, models, products).
//!
//! Each file is a JSON array. The array itself must parse; individual
//! elements that fail to decode or validate are dropped with a reason and
//! their 1-based position in the array.

use std::path::Path;

use partsync_core::{slugify, ProductLine};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SourceError;
use crate::fields::{clean_cell, clean_reference, parse_dmy};
use crate::types::{BrandRecord, DroppedRow, Loaded, ModelRecord, ProductRecord};

#[derive(Debug, Deserialize)]
struct RawBrand {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    brand_slug: Option<String>,
    #[serde(default)]
    model_slug: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    line: Option<ProductLine>,
    #[serde(default)]
    description: Option<String>,
}

fn read_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Decode a JSON array element by element, validating each with `validate`.
fn parse_array<R, T, F>(content: &str, context: &str, validate: F) -> Result<Loaded<T>, SourceError>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, String>,
{
    let items: Vec<Value> = serde_json::from_str(content).map_err(|e| SourceError::Json {
        context: context.to_string(),
        source: e,
    })?;

    let mut loaded = Loaded::default();
    for (idx, item) in items.into_iter().enumerate() {
        let line = idx + 1;
        let outcome = serde_json::from_value::<R>(item)
            .map_err(|e| format!("malformed record: {e}"))
            .and_then(&validate);
        match outcome {
            Ok(record) => loaded.records.push(record),
            Err(reason) => {
                tracing::debug!(context, line, reason = %reason, "dropping source record");
                loaded.dropped.push(DroppedRow::new(line, reason));
            }
        }
    }
    Ok(loaded)
}

fn required(value: Option<&str>, field: &str) -> Result<String, String> {
    value
        .and_then(clean_cell)
        .ok_or_else(|| format!("missing {field}"))
}

fn slugifiable_name(value: Option<&str>) -> Result<String, String> {
    let name = value.and_then(clean_cell).ok_or("empty name")?;
    if slugify(&name).is_empty() {
        return Err(format!("name '{name}' has no slug characters"));
    }
    Ok(name)
}

fn validate_brand(raw: RawBrand) -> Result<BrandRecord, String> {
    Ok(BrandRecord {
        name: slugifiable_name(raw.name.as_deref())?,
        active: raw.active.unwrap_or(true),
    })
}

fn validate_model(raw: RawModel) -> Result<ModelRecord, String> {
    let name = slugifiable_name(raw.name.as_deref())?;
    let brand_slug = raw
        .brand_slug
        .as_deref()
        .and_then(clean_cell)
        .ok_or("missing parent slug")?;
    Ok(ModelRecord {
        name,
        brand_slug,
        model_slug: raw.model_slug.as_deref().and_then(clean_cell),
        start_date: parse_dmy(raw.start_date.as_deref())?,
        end_date: parse_dmy(raw.end_date.as_deref())?,
    })
}

fn validate_product(raw: RawProduct) -> Result<ProductRecord, String> {
    let reference = raw
        .reference
        .as_deref()
        .and_then(clean_reference)
        .ok_or("missing ref")?;
    Ok(ProductRecord {
        reference,
        brand: required(raw.brand.as_deref(), "brand")?,
        model: required(raw.model.as_deref(), "model")?,
        position: required(raw.position.as_deref(), "position")?,
        category: required(raw.category.as_deref(), "category")?,
        line: raw.line.ok_or("missing line")?,
        description: raw.description.as_deref().and_then(clean_cell),
    })
}

/// Parse a brands extract: `[{ "name": …, "active": … }]`.
///
/// # Errors
///
/// Returns `SourceError::Json` if the content is not a JSON array.
pub fn parse_brands(content: &str) -> Result<Loaded<BrandRecord>, SourceError> {
    parse_array(content, "brands", validate_brand)
}

/// Parse a models extract with `DD/MM/YYYY` dates.
///
/// # Errors
///
/// Returns `SourceError::Json` if the content is not a JSON array.
pub fn parse_models(content: &str) -> Result<Loaded<ModelRecord>, SourceError> {
    parse_array(content, "models", validate_model)
}

/// Parse a products extract.
///
/// # Errors
///
/// Returns `SourceError::Json` if the content is not a JSON array.
pub fn parse_products(content: &str) -> Result<Loaded<ProductRecord>, SourceError> {
    parse_array(content, "products", validate_product)
}

/// # Errors
///
/// Returns `SourceError` if the file cannot be read or is not a JSON array.
pub fn load_brands(path: &Path) -> Result<Loaded<BrandRecord>, SourceError> {
    parse_brands(&read_file(path)?)
}

/// # Errors
///
/// Returns `SourceError` if the file cannot be read or is not a JSON array.
pub fn load_models(path: &Path) -> Result<Loaded<ModelRecord>, SourceError> {
    parse_models(&read_file(path)?)
}

/// # Errors
///
/// Returns `SourceError` if the file cannot be read or is not a JSON array.
pub fn load_products(path: &Path) -> Result<Loaded<ProductRecord>, SourceError> {
    parse_products(&read_file(path)?)
}

#[cfg(test)]
#[path = "json_test.rs"]
mod tests;
