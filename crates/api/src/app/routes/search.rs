use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use storefront_infra::search::SearchFilters;

use crate::app::errors;
use crate::app::services::AppServices;

/// Faceted search over the catalog; the configured facet mode decides how
/// several criteria combine.
pub async fn search_filters(
    Extension(services): Extension<Arc<AppServices>>,
    Json(filters): Json<SearchFilters>,
) -> axum::response::Response {
    match services.catalog.search_filters(&filters).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
