pub mod aliases;
pub mod app_config;
pub mod config;
pub mod entities;
pub mod slug;

pub use aliases::{AliasTable, ALIAS_TABLE_VERSION};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, MAX_PAGE_SIZE};
pub use entities::{
    model_name_key, position_name_key, Brand, CatalogEntity, Collection, Model, NewBrand, NewModel,
    NewPosition, NewProduct, Position, Product, ProductLine,
};
pub use slug::{normalize_name, product_key, slugify, strip_brand_prefix};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read alias file {path}: {source}")]
    AliasFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse alias file: {0}")]
    AliasFileParse(#[from] serde_yaml::Error),

    #[error("alias table validation failed: {0}")]
    Validation(String),
}
