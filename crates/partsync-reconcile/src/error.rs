use partsync_catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to build {collection} index: {source}")]
    IndexBuild {
        collection: String,
        #[source]
        source: CatalogError,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
