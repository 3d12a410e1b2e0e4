pub mod error;
mod fields;
pub mod json;
pub mod types;
pub mod wipers_csv;

pub use error::SourceError;
pub use json::{load_brands, load_models, load_products, parse_brands, parse_models, parse_products};
pub use types::{
    BrandRecord, DroppedRow, Loaded, ModelRecord, MulticonnexionRefs, ProductRecord, SourceBatch,
    SourceFormat, StandardRefs, WiperRefs, WiperSlot, WiperVehicle,
};
pub use wipers_csv::{load_wipers, parse_wipers, WiperLayout};

use std::path::Path;

/// Load `path` in the given format.
///
/// # Errors
///
/// Returns `SourceError` when the file is missing, unreadable, or not
/// decodable as a whole. Individual bad rows are reported in the batch's
/// dropped list instead.
pub fn load(format: SourceFormat, path: &Path) -> Result<SourceBatch, SourceError> {
    let batch = match format {
        SourceFormat::BrandsJson => SourceBatch::Brands(load_brands(path)?),
        SourceFormat::ModelsJson => SourceBatch::Models(load_models(path)?),
        SourceFormat::ProductsJson => SourceBatch::Products(load_products(path)?),
        SourceFormat::WipersCsv(layout) => SourceBatch::Wipers(load_wipers(path, layout)?),
    };
    tracing::info!(
        format = %format,
        path = %path.display(),
        records = batch.record_count(),
        dropped = batch.dropped().len(),
        "source file loaded"
    );
    Ok(batch)
}
