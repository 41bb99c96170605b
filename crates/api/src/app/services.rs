//! Store selection and service wiring.

use std::sync::Arc;

use storefront_infra::catalog_store::{InMemoryCatalogStore, PostgresCatalogStore, StoreError};
use storefront_infra::{CatalogConfig, CatalogService, SharedStore};

use crate::config::ApiConfig;

/// Long-lived handles shared by every request.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
}

impl AppServices {
    pub fn new(store: SharedStore, config: CatalogConfig) -> Self {
        Self {
            catalog: CatalogService::new(store, config),
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(config: CatalogConfig) -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()), config)
    }
}

/// Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url).await?;
            tracing::info!("using postgres catalog store");
            Ok(AppServices::new(Arc::new(store), config.catalog.clone()))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory catalog store");
            Ok(AppServices::in_memory(config.catalog.clone()))
        }
    }
}
