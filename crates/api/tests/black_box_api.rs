use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::app::{build_app, services::AppServices};
use storefront_core::UserId;
use storefront_infra::search::FacetMode;
use storefront_infra::CatalogConfig;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(CatalogConfig::default()).await
    }

    async fn spawn_with(config: CatalogConfig) -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory(config)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn rate(&self, product_id: &str, user: Option<UserId>, star: i64) -> (StatusCode, Value) {
        let mut req = self
            .client
            .put(self.url(&format!("/api/product/star/{product_id}")))
            .json(&json!({ "star": star }));
        if let Some(user) = user {
            req = req.header("x-user-id", user.to_string());
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_product(&self, body: Value) -> Value {
        let (status, created) = self.post("/api/product", body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
        created
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn ids(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_category_is_a_conflict() {
    let srv = TestServer::spawn().await;

    let (status, first) = srv.post("/api/category", json!({ "name": "Shoes" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["slug"], "shoes");

    let (status, body) = srv.post("/api/category", json!({ "name": "Shoes" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, all) = srv.get("/api/categories").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rating_requires_an_acting_user() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product(json!({ "title": "Sock", "price": 2 })).await;
    let id = product["id"].as_str().unwrap();

    let (status, _) = srv.rate(id, None, 4).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rating_twice_leaves_one_entry_with_the_latest_star() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product(json!({ "title": "Gel Trail", "price": 90 })).await;
    let id = product["id"].as_str().unwrap();
    let user = UserId::new();

    let (status, added) = srv.rate(id, Some(user), 4).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["ratings"].as_array().unwrap().len(), 1);

    let (status, ack) = srv.rate(id, Some(user), 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["matchedCount"], 1);
    assert_eq!(ack["modifiedCount"], 1);

    let (_, stored) = srv.get("/api/product/gel-trail").await;
    let ratings = stored["ratings"].as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["star"], 2);
    assert_eq!(ratings[0]["postedBy"], user.to_string());
}

#[tokio::test]
async fn out_of_range_star_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product(json!({ "title": "Cap", "price": 12 })).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = srv.rate(id, Some(UserId::new()), 7).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn star_buckets_use_the_floored_mean() {
    let srv = TestServer::spawn().await;
    let five = srv.create_product(json!({ "title": "Five", "price": 1 })).await;
    let three = srv.create_product(json!({ "title": "Three", "price": 1 })).await;
    srv.create_product(json!({ "title": "Unrated", "price": 1 })).await;

    for star in [5, 5] {
        srv.rate(five["id"].as_str().unwrap(), Some(UserId::new()), star).await;
    }
    for star in [3, 4] {
        srv.rate(three["id"].as_str().unwrap(), Some(UserId::new()), star).await;
    }

    let (status, found) = srv.post("/api/search/filters", json!({ "stars": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&found), vec![five["id"].as_str().unwrap().to_string()]);

    let (_, found) = srv.post("/api/search/filters", json!({ "stars": 3 })).await;
    assert_eq!(ids(&found), vec![three["id"].as_str().unwrap().to_string()]);

    let (_, found) = srv.post("/api/search/filters", json!({ "stars": 4 })).await;
    assert!(found.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn price_filter_is_inclusive_and_zero_bound_counts() {
    let srv = TestServer::spawn().await;
    let free = srv.create_product(json!({ "title": "Free Sample", "price": 0 })).await;
    let hundred = srv.create_product(json!({ "title": "Boot", "price": 100 })).await;
    srv.create_product(json!({ "title": "Jacket", "price": 100.5 })).await;

    let (status, found) = srv.post("/api/search/filters", json!({ "price": [0, 100] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&found),
        vec![
            free["id"].as_str().unwrap().to_string(),
            hundred["id"].as_str().unwrap().to_string()
        ]
    );
}

#[tokio::test]
async fn search_results_expand_references() {
    let srv = TestServer::spawn().await;
    let (_, shoes) = srv.post("/api/category", json!({ "name": "Shoes" })).await;
    let (status, trail) = srv
        .post("/api/sub", json!({ "name": "Trail", "parent": shoes["id"] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    srv.create_product(json!({
        "title": "Gel Trail",
        "price": 90,
        "category": shoes["id"],
        "subs": [trail["id"]],
        "color": "Black",
    }))
    .await;

    let (_, found) = srv
        .post("/api/search/filters", json!({ "sub": trail["id"], "color": "Black" }))
        .await;
    let product = &found.as_array().unwrap()[0];
    assert_eq!(product["category"], json!({ "id": shoes["id"], "name": "Shoes" }));
    assert_eq!(product["subs"], json!([{ "id": trail["id"], "name": "Trail" }]));
}

#[tokio::test]
async fn exclusive_mode_keeps_only_the_last_facet() {
    let srv = TestServer::spawn_with(CatalogConfig {
        facet_mode: FacetMode::Exclusive,
        ..CatalogConfig::default()
    })
    .await;
    let cheap_red = srv
        .create_product(json!({ "title": "Cheap Red", "price": 5, "color": "Red" }))
        .await;
    let pricey_blue = srv
        .create_product(json!({ "title": "Pricey Blue", "price": 500, "brand": "Acme" }))
        .await;

    // brand is evaluated after price and color.
    let (_, found) = srv
        .post(
            "/api/search/filters",
            json!({ "price": [0, 10], "color": "Red", "brand": "Acme" }),
        )
        .await;
    assert_eq!(ids(&found), vec![pricey_blue["id"].as_str().unwrap().to_string()]);
    assert!(!ids(&found).contains(&cheap_red["id"].as_str().unwrap().to_string()));
}

#[tokio::test]
async fn second_page_returns_ranks_four_to_six() {
    let srv = TestServer::spawn().await;
    let mut created = Vec::new();
    for i in 0..7 {
        let p = srv
            .create_product(json!({ "title": format!("Item {i}"), "price": 1 }))
            .await;
        created.push(p["id"].as_str().unwrap().to_string());
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let (status, page) = srv
        .post("/api/products", json!({ "sort": "createdAt", "order": "desc", "page": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&page), vec![created[3].clone(), created[2].clone(), created[1].clone()]);

    let (_, total) = srv.get("/api/products/total").await;
    assert_eq!(total, 7);
}

#[tokio::test]
async fn product_update_regenerates_slug_and_rejects_bad_category() {
    let srv = TestServer::spawn().await;
    srv.create_product(json!({ "title": "Trail Runner", "price": 80 })).await;

    let res = srv
        .client
        .put(srv.url("/api/product/trail-runner"))
        .json(&json!({ "category": "not-an-id" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = srv
        .client
        .put(srv.url("/api/product/trail-runner"))
        .json(&json!({ "title": "Trail Runner 2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["slug"], "trail-runner-2");

    let (status, _) = srv.get("/api/product/trail-runner").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_entities_are_not_found() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/product/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = srv.get("/api/category/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .get(&format!("/api/product/related/{}", UserId::new()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
