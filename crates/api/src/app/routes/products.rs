use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use storefront_core::ProductId;
use storefront_infra::search::PageRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let input = match body.into_new_product() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.create_product(input).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn read_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.read_product(&slug).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let patch = match body.into_patch() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.update_product(&slug, patch).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.remove_product(&slug).await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
    Path(count): Path<String>,
) -> axum::response::Response {
    let count = match dto::parse_count(&count) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.list_all(count).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_page(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PageRequest>,
) -> axum::response::Response {
    match services.catalog.list_page(&body).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn products_count(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.products_count().await {
        Ok(total) => (StatusCode::OK, Json(total)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_related(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::parse_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.list_related(product_id).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn rate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(product_id): Path<String>,
    Json(body): Json<dto::RatingRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::parse_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog
        .rate_product(product_id, actor.user_id(), body.star)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
