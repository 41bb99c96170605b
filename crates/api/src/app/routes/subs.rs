use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_core::CategoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/sub", post(create_sub))
        .route("/subs", get(list_subs))
        .route("/sub/:slug", get(read_sub).put(update_sub).delete(remove_sub))
}

pub async fn create_sub(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubRequest>,
) -> axum::response::Response {
    let input = match body.into_new_sub() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.create_sub(input).await {
        Ok(sub) => (StatusCode::CREATED, Json(sub)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_subs(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.list_subs().await {
        Ok(subs) => (StatusCode::OK, Json(subs)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn read_sub(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.read_sub(&slug).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_sub(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
    Json(body): Json<dto::SubRequest>,
) -> axum::response::Response {
    let parent: CategoryId = match dto::parse_id(&body.parent) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.update_sub(&slug, &body.name, parent).await {
        Ok(sub) => (StatusCode::OK, Json(sub)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn remove_sub(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.catalog.remove_sub(&slug).await {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
