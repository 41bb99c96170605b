//! Infrastructure layer: catalog store adapters, query engine, service, config.

pub mod catalog_service;
pub mod catalog_store;
pub mod config;
pub mod error;
pub mod search;

pub use catalog_service::{CatalogService, CategoryDetail, SharedStore, SubDetail};
pub use config::CatalogConfig;
pub use error::CatalogError;
