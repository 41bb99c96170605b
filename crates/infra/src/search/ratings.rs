//! Rating Aggregator and Rating Upsert Engine.

use tracing::{debug, instrument};

use storefront_catalog::{ProductView, Stars};
use storefront_core::{ProductId, UserId};

use crate::catalog_store::{CatalogStore, ProductPredicate, ProductQuery, RatingOutcome};
use crate::error::CatalogError;

use super::expand::expand_products;

/// Default cap on the candidates returned for one star bucket.
pub const DEFAULT_BUCKET_LIMIT: usize = 12;

/// Finds products whose floored mean rating equals a star bucket.
///
/// Two stages: the store aggregates and caps the candidate ids, then the
/// candidates are refetched as full documents and expanded. The refetch does
/// not re-check the bucket, so a rating that lands between the stages can
/// return a product whose bucket just moved.
#[derive(Debug, Clone)]
pub struct RatingAggregator<S> {
    store: S,
    limit: usize,
}

impl<S> RatingAggregator<S>
where
    S: CatalogStore,
{
    pub fn new(store: S, limit: usize) -> Self {
        Self { store, limit }
    }

    #[instrument(skip(self), fields(bucket = %bucket, limit = self.limit), err)]
    pub async fn products_in_bucket(&self, bucket: Stars) -> Result<Vec<ProductView>, CatalogError> {
        let candidates = self.store.aggregate_rating_buckets(bucket, self.limit).await?;
        debug!(candidates = candidates.len(), "rating bucket aggregated");
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids = candidates.iter().map(|c| c.product_id).collect();
        let products = self
            .store
            .find_products(&ProductQuery::matching(vec![ProductPredicate::IdIn(ids)]))
            .await?;
        Ok(expand_products(&self.store, products).await?)
    }
}

/// Records a user's rating of a product: one entry per user, last star wins.
#[derive(Debug, Clone)]
pub struct RatingUpsertEngine<S> {
    store: S,
}

impl<S> RatingUpsertEngine<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate the star value and upsert it atomically for `(product, user)`.
    #[instrument(skip(self), fields(product_id = %product_id, user = %user), err)]
    pub async fn rate(&self, product_id: ProductId, user: UserId, star: i64) -> Result<RatingOutcome, CatalogError> {
        let star = Stars::from_i64(star)?;
        let outcome = self
            .store
            .upsert_rating(product_id, user, star)
            .await?
            .ok_or_else(|| CatalogError::not_found(format!("product '{product_id}'")))?;

        match &outcome {
            RatingOutcome::Added(_) => debug!(star = %star, "rating added"),
            RatingOutcome::Updated(ack) => debug!(star = %star, modified = ack.modified_count, "rating updated"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use storefront_catalog::{NewProduct, Product};

    use super::*;
    use crate::catalog_store::{InMemoryCatalogStore, UpdateAck};

    fn product(title: &str) -> Product {
        NewProduct {
            title: title.to_string(),
            description: String::new(),
            price: 10.0,
            category: None,
            subs: vec![],
            quantity: 1,
            shipping: false,
            color: String::new(),
            brand: String::new(),
        }
        .into_product(ProductId::new(), Utc::now())
        .unwrap()
    }

    async fn seeded(ratings: &[&[u8]]) -> (Arc<InMemoryCatalogStore>, Vec<ProductId>) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let mut ids = Vec::new();
        for (i, stars) in ratings.iter().enumerate() {
            let p = store.insert_product(product(&format!("Product {i}"))).await.unwrap();
            for star in *stars {
                store
                    .upsert_rating(p.id, UserId::new(), Stars::new(*star).unwrap())
                    .await
                    .unwrap();
            }
            ids.push(p.id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn bucket_five_returns_only_the_perfect_product() {
        let (store, ids) = seeded(&[&[5, 5], &[3, 4], &[]]).await;
        let aggregator = RatingAggregator::new(store, DEFAULT_BUCKET_LIMIT);

        let found = aggregator.products_in_bucket(Stars::new(5).unwrap()).await.unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[0]]);
    }

    #[tokio::test]
    async fn mean_three_and_a_half_lands_in_bucket_three() {
        let (store, ids) = seeded(&[&[5, 5], &[3, 4], &[]]).await;
        let aggregator = RatingAggregator::new(store, DEFAULT_BUCKET_LIMIT);

        let three = aggregator.products_in_bucket(Stars::new(3).unwrap()).await.unwrap();
        assert_eq!(three.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[1]]);

        let four = aggregator.products_in_bucket(Stars::new(4).unwrap()).await.unwrap();
        assert!(four.is_empty());
    }

    #[tokio::test]
    async fn candidates_are_capped() {
        const TWO: &[u8] = &[2];
        let (store, _) = seeded(&[TWO; 15]).await;
        let aggregator = RatingAggregator::new(store, DEFAULT_BUCKET_LIMIT);

        let found = aggregator.products_in_bucket(Stars::new(2).unwrap()).await.unwrap();
        assert_eq!(found.len(), DEFAULT_BUCKET_LIMIT);
    }

    #[tokio::test]
    async fn rating_twice_overwrites_the_single_entry() {
        let (store, ids) = seeded(&[&[]]).await;
        let engine = RatingUpsertEngine::new(store.clone());
        let user = UserId::new();

        let first = engine.rate(ids[0], user, 4).await.unwrap();
        assert!(matches!(first, RatingOutcome::Added(ref p) if p.ratings.len() == 1));

        let second = engine.rate(ids[0], user, 2).await.unwrap();
        assert_eq!(
            second,
            RatingOutcome::Updated(UpdateAck {
                matched_count: 1,
                modified_count: 1
            })
        );

        let stored = store.find_product_by_id(ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.ratings.len(), 1);
        assert_eq!(stored.rating_by(user).unwrap().star.get(), 2);
    }

    #[tokio::test]
    async fn out_of_range_star_is_rejected_before_any_write() {
        let (store, ids) = seeded(&[&[]]).await;
        let engine = RatingUpsertEngine::new(store.clone());

        for star in [0, 6, -3] {
            let err = engine.rate(ids[0], UserId::new(), star).await.unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)));
        }
        let stored = store.find_product_by_id(ids[0]).await.unwrap().unwrap();
        assert!(stored.ratings.is_empty());
    }

    #[tokio::test]
    async fn rating_an_unknown_product_is_not_found() {
        let engine = RatingUpsertEngine::new(Arc::new(InMemoryCatalogStore::new()));
        let err = engine.rate(ProductId::new(), UserId::new(), 3).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
