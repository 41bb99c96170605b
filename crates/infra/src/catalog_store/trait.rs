use std::sync::Arc;

use thiserror::Error;

use storefront_catalog::{Category, Product, Stars, Sub};
use storefront_core::{CategoryId, ProductId, SubId, UserId};

use super::query::{ProductQuery, RatingAggregate, RatingOutcome};

/// Catalog store operation error.
///
/// These are **infrastructure errors** (storage, encoding, uniqueness enforced
/// by the backend) as opposed to domain errors (validation).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (category name, slug) is already taken.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The backend failed to execute the operation.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A stored row could not be decoded into a domain value.
    #[error("failed to decode stored document: {0}")]
    Decode(String),

    /// The backend is unreachable (pool closed, connection refused).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Catalog Store Adapter: the document-store boundary of the catalog.
///
/// Adapters own persistence only. Single-document writes must be atomic, and
/// `upsert_rating` must be atomic per `(product, user)` pair: two concurrent
/// calls for the same pair never produce two rating entries.
///
/// Lookups that miss return `Ok(None)`; mapping that to a not-found error is
/// the caller's decision.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    // ---- products ----

    /// Insert a new product. Fails with `Duplicate` if the slug is taken.
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError>;

    /// Find products matching the conjunctive query.
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError>;

    /// Replace the stored document with the same id, keeping its ratings.
    /// Returns the stored result, or `None` if no such product exists.
    async fn update_product(&self, product: Product) -> Result<Option<Product>, StoreError>;

    async fn delete_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError>;

    /// Approximate number of products.
    async fn estimated_product_count(&self) -> Result<u64, StoreError>;

    /// Aggregation stage of the rating buckets: products whose floored mean
    /// rating equals `bucket`, in natural order, at most `limit` of them.
    async fn aggregate_rating_buckets(
        &self,
        bucket: Stars,
        limit: usize,
    ) -> Result<Vec<RatingAggregate>, StoreError>;

    /// Atomically insert the user's rating or overwrite its star.
    ///
    /// Returns `None` if the product does not exist.
    async fn upsert_rating(
        &self,
        product_id: ProductId,
        user: UserId,
        star: Stars,
    ) -> Result<Option<RatingOutcome>, StoreError>;

    // ---- categories ----

    /// Insert a new category. Fails with `Duplicate` if the name is taken.
    async fn insert_category(&self, category: Category) -> Result<Category, StoreError>;

    /// All categories, newest first.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn find_category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, StoreError>;

    /// Replace the category with the same id. Fails with `Duplicate` if the
    /// new name belongs to another category.
    async fn update_category(&self, category: Category) -> Result<Option<Category>, StoreError>;

    async fn delete_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    // ---- subs ----

    async fn insert_sub(&self, sub: Sub) -> Result<Sub, StoreError>;

    /// All subs, newest first.
    async fn list_subs(&self) -> Result<Vec<Sub>, StoreError>;

    async fn find_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError>;

    async fn find_subs_by_ids(&self, ids: &[SubId]) -> Result<Vec<Sub>, StoreError>;

    async fn find_subs_by_parent(&self, parent: CategoryId) -> Result<Vec<Sub>, StoreError>;

    async fn update_sub(&self, sub: Sub) -> Result<Option<Sub>, StoreError>;

    async fn delete_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError>;
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        (**self).insert_product(product).await
    }

    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        (**self).find_products(query).await
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_product_by_id(id).await
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        (**self).find_product_by_slug(slug).await
    }

    async fn update_product(&self, product: Product) -> Result<Option<Product>, StoreError> {
        (**self).update_product(product).await
    }

    async fn delete_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        (**self).delete_product_by_slug(slug).await
    }

    async fn estimated_product_count(&self) -> Result<u64, StoreError> {
        (**self).estimated_product_count().await
    }

    async fn aggregate_rating_buckets(
        &self,
        bucket: Stars,
        limit: usize,
    ) -> Result<Vec<RatingAggregate>, StoreError> {
        (**self).aggregate_rating_buckets(bucket, limit).await
    }

    async fn upsert_rating(
        &self,
        product_id: ProductId,
        user: UserId,
        star: Stars,
    ) -> Result<Option<RatingOutcome>, StoreError> {
        (**self).upsert_rating(product_id, user, star).await
    }

    async fn insert_category(&self, category: Category) -> Result<Category, StoreError> {
        (**self).insert_category(category).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list_categories().await
    }

    async fn find_category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        (**self).find_category_by_id(id).await
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        (**self).find_category_by_slug(slug).await
    }

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, StoreError> {
        (**self).find_categories_by_ids(ids).await
    }

    async fn update_category(&self, category: Category) -> Result<Option<Category>, StoreError> {
        (**self).update_category(category).await
    }

    async fn delete_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        (**self).delete_category_by_slug(slug).await
    }

    async fn insert_sub(&self, sub: Sub) -> Result<Sub, StoreError> {
        (**self).insert_sub(sub).await
    }

    async fn list_subs(&self) -> Result<Vec<Sub>, StoreError> {
        (**self).list_subs().await
    }

    async fn find_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        (**self).find_sub_by_slug(slug).await
    }

    async fn find_subs_by_ids(&self, ids: &[SubId]) -> Result<Vec<Sub>, StoreError> {
        (**self).find_subs_by_ids(ids).await
    }

    async fn find_subs_by_parent(&self, parent: CategoryId) -> Result<Vec<Sub>, StoreError> {
        (**self).find_subs_by_parent(parent).await
    }

    async fn update_sub(&self, sub: Sub) -> Result<Option<Sub>, StoreError> {
        (**self).update_sub(sub).await
    }

    async fn delete_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        (**self).delete_sub_by_slug(slug).await
    }
}
