use axum::{middleware, routing::{get, post, put}, Router};

pub mod categories;
pub mod products;
pub mod search;
pub mod subs;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    // Rating needs an acting user; everything else is anonymous.
    let rating = Router::new()
        .route("/product/star/:product_id", put(products::rate_product))
        .route_layer(middleware::from_fn(crate::middleware::actor_middleware));

    Router::new()
        .route("/product", post(products::create_product))
        .route("/products/total", get(products::products_count))
        .route("/products/:count", get(products::list_all))
        .route("/products", post(products::list_page))
        .route(
            "/product/:slug",
            get(products::read_product)
                .put(products::update_product)
                .delete(products::remove_product),
        )
        .route("/product/related/:product_id", get(products::list_related))
        .route("/search/filters", post(search::search_filters))
        .merge(rating)
        .merge(categories::router())
        .merge(subs::router())
}
