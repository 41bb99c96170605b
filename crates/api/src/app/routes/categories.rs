use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_catalog::NewCategory;
use storefront_core::CategoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/category", post(create_category))
        .route("/categories", get(list_categories))
        .route(
            "/category/:slug",
            get(read_category).put(update_category).delete(remove_category),
        )
        .route("/category/subs/:id", get(category_subs))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CategoryRequest>,
) -> axum::response::Response {
    match services
        .catalog
        .create_category(NewCategory { name: body.name })
        .await
    {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.list_categories().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn read_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.read_category(&slug).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
    Json(body): Json<dto::CategoryRequest>,
) -> axum::response::Response {
    match services.catalog.update_category(&slug, &body.name).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn remove_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.remove_category(&slug).await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn category_subs(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.category_subs(id).await {
        Ok(subs) => (StatusCode::OK, Json(subs)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
