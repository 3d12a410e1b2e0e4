pub mod catalog;
pub mod client;
pub mod error;
pub mod fetch_all;
pub mod index;
pub mod memory;
pub mod pagination;
mod retry;

pub use catalog::{Catalog, Page, PageMeta};
pub use client::HttpCatalog;
pub use error::CatalogError;
pub use fetch_all::{fetch_all, MAX_PAGES};
pub use index::{decode_entry, CatalogIndex};
pub use memory::MemoryCatalog;
