use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use storefront_catalog::{Category, Product, RatingChange, Stars, Sub};
use storefront_core::{CategoryId, Entity, ProductId, SubId, UserId};

use super::query::{ProductQuery, RatingAggregate, RatingOutcome, UpdateAck};
use super::r#trait::{CatalogStore, StoreError};

#[derive(Debug, Default)]
struct Collections {
    // Vec keeps insertion order, which is the natural store order.
    products: Vec<Product>,
    categories: Vec<Category>,
    subs: Vec<Sub>,
}

/// In-memory catalog store.
///
/// Intended for tests/dev. One lock guards all collections, so every
/// operation (including the rating upsert) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Collections>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn by_slug<T: Entity + Clone>(items: &[T], slug: &str) -> Option<T> {
    items.iter().find(|item| item.slug() == slug).cloned()
}

fn remove_by_slug<T: Entity>(items: &mut Vec<T>, slug: &str) -> Option<T> {
    let idx = items.iter().position(|item| item.slug() == slug)?;
    Some(items.remove(idx))
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        let mut c = self.write()?;
        if c.products.iter().any(|p| p.slug == product.slug) {
            return Err(StoreError::Duplicate(format!("product slug '{}'", product.slug)));
        }
        c.products.push(product.clone());
        Ok(product)
    }

    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let c = self.read()?;
        let mut found: Vec<Product> = c
            .products
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        drop(c);

        if let Some(sort) = query.sort {
            // Stable sort: ties keep natural order.
            found.sort_by(|a, b| sort.compare(a, b));
        }

        let window = found.into_iter().skip(query.skip);
        Ok(match query.limit {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        })
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        Ok(by_slug(&self.read()?.products, slug))
    }

    async fn update_product(&self, product: Product) -> Result<Option<Product>, StoreError> {
        let mut c = self.write()?;
        if c
            .products
            .iter()
            .any(|p| p.slug == product.slug && p.id != product.id)
        {
            return Err(StoreError::Duplicate(format!("product slug '{}'", product.slug)));
        }
        let Some(stored) = c.products.iter_mut().find(|p| p.id == product.id) else {
            return Ok(None);
        };
        let ratings = std::mem::take(&mut stored.ratings);
        *stored = Product { ratings, ..product };
        Ok(Some(stored.clone()))
    }

    async fn delete_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        Ok(remove_by_slug(&mut self.write()?.products, slug))
    }

    async fn estimated_product_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.products.len() as u64)
    }

    async fn aggregate_rating_buckets(
        &self,
        bucket: Stars,
        limit: usize,
    ) -> Result<Vec<RatingAggregate>, StoreError> {
        let c = self.read()?;
        Ok(c.products
            .iter()
            .filter_map(|p| {
                p.floor_average().map(|floor_average| RatingAggregate {
                    product_id: p.id,
                    floor_average,
                })
            })
            .filter(|agg| agg.floor_average == bucket.get())
            .take(limit)
            .collect())
    }

    async fn upsert_rating(
        &self,
        product_id: ProductId,
        user: UserId,
        star: Stars,
    ) -> Result<Option<RatingOutcome>, StoreError> {
        // Check and write happen under the same write guard.
        let mut c = self.write()?;
        let Some(product) = c.products.iter_mut().find(|p| p.id == product_id) else {
            return Ok(None);
        };

        let outcome = match product.apply_rating(user, star, Utc::now()) {
            RatingChange::Added => RatingOutcome::Added(product.clone()),
            RatingChange::Updated { previous } => RatingOutcome::Updated(UpdateAck {
                matched_count: 1,
                modified_count: u64::from(previous != star),
            }),
        };
        Ok(Some(outcome))
    }

    async fn insert_category(&self, category: Category) -> Result<Category, StoreError> {
        let mut c = self.write()?;
        if c
            .categories
            .iter()
            .any(|x| x.name == category.name || x.slug == category.slug)
        {
            return Err(StoreError::Duplicate(format!("category name '{}'", category.name)));
        }
        c.categories.push(category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let all = self.read()?.categories.clone();
        Ok(newest_first(all, |c| c.created_at))
    }

    async fn find_category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(by_slug(&self.read()?.categories, slug))
    }

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .read()?
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn update_category(&self, category: Category) -> Result<Option<Category>, StoreError> {
        let mut c = self.write()?;
        if c
            .categories
            .iter()
            .any(|x| (x.name == category.name || x.slug == category.slug) && x.id != category.id)
        {
            return Err(StoreError::Duplicate(format!("category name '{}'", category.name)));
        }
        let Some(stored) = c.categories.iter_mut().find(|x| x.id == category.id) else {
            return Ok(None);
        };
        *stored = category;
        Ok(Some(stored.clone()))
    }

    async fn delete_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(remove_by_slug(&mut self.write()?.categories, slug))
    }

    async fn insert_sub(&self, sub: Sub) -> Result<Sub, StoreError> {
        let mut c = self.write()?;
        if c.subs.iter().any(|x| x.slug == sub.slug) {
            return Err(StoreError::Duplicate(format!("sub slug '{}'", sub.slug)));
        }
        c.subs.push(sub.clone());
        Ok(sub)
    }

    async fn list_subs(&self) -> Result<Vec<Sub>, StoreError> {
        let all = self.read()?.subs.clone();
        Ok(newest_first(all, |s| s.created_at))
    }

    async fn find_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        Ok(by_slug(&self.read()?.subs, slug))
    }

    async fn find_subs_by_ids(&self, ids: &[SubId]) -> Result<Vec<Sub>, StoreError> {
        Ok(self
            .read()?
            .subs
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn find_subs_by_parent(&self, parent: CategoryId) -> Result<Vec<Sub>, StoreError> {
        Ok(self
            .read()?
            .subs
            .iter()
            .filter(|s| s.parent == parent)
            .cloned()
            .collect())
    }

    async fn update_sub(&self, sub: Sub) -> Result<Option<Sub>, StoreError> {
        let mut c = self.write()?;
        if c.subs.iter().any(|x| x.slug == sub.slug && x.id != sub.id) {
            return Err(StoreError::Duplicate(format!("sub slug '{}'", sub.slug)));
        }
        let Some(stored) = c.subs.iter_mut().find(|x| x.id == sub.id) else {
            return Ok(None);
        };
        *stored = sub;
        Ok(Some(stored.clone()))
    }

    async fn delete_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        Ok(remove_by_slug(&mut self.write()?.subs, slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storefront_catalog::{NewCategory, NewProduct};

    fn product(title: &str) -> Product {
        NewProduct {
            title: title.to_string(),
            description: String::new(),
            price: 10.0,
            category: None,
            subs: vec![],
            quantity: 1,
            shipping: true,
            color: "Black".to_string(),
            brand: "Acme".to_string(),
        }
        .into_product(ProductId::new(), Utc::now())
        .unwrap()
    }

    fn stars(v: u8) -> Stars {
        Stars::new(v).unwrap()
    }

    #[tokio::test]
    async fn duplicate_category_name_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let shoes = || {
            NewCategory {
                name: "Shoes".to_string(),
            }
            .into_category(CategoryId::new(), Utc::now())
            .unwrap()
        };

        store.insert_category(shoes()).await.unwrap();
        let err = store.insert_category(shoes()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_rating_appends_then_updates() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Tee")).await.unwrap();
        let user = UserId::new();

        let first = store.upsert_rating(p.id, user, stars(4)).await.unwrap().unwrap();
        match first {
            RatingOutcome::Added(updated) => assert_eq!(updated.ratings.len(), 1),
            other => panic!("expected Added, got {other:?}"),
        }

        let second = store.upsert_rating(p.id, user, stars(2)).await.unwrap().unwrap();
        assert_eq!(
            second,
            RatingOutcome::Updated(UpdateAck {
                matched_count: 1,
                modified_count: 1
            })
        );

        let stored = store.find_product_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(stored.ratings.len(), 1);
        assert_eq!(stored.ratings[0].star.get(), 2);
    }

    #[tokio::test]
    async fn upsert_rating_on_missing_product_is_none() {
        let store = InMemoryCatalogStore::new();
        let outcome = store
            .upsert_rating(ProductId::new(), UserId::new(), stars(3))
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_by_same_user_never_duplicate() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let p = store.insert_product(product("Mug")).await.unwrap();
        let user = UserId::new();

        let tasks: Vec<_> = (0..32u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert_rating(p.id, user, stars(i % 5 + 1)).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let stored = store.find_product_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(stored.ratings.len(), 1);
    }

    #[tokio::test]
    async fn update_product_keeps_ratings() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Cap")).await.unwrap();
        store.upsert_rating(p.id, UserId::new(), stars(5)).await.unwrap();

        let mut edited = p.clone();
        edited.color = "Red".to_string();
        let stored = store.update_product(edited).await.unwrap().unwrap();
        assert_eq!(stored.color, "Red");
        assert_eq!(stored.ratings.len(), 1);
    }

    #[tokio::test]
    async fn aggregate_caps_candidates() {
        let store = InMemoryCatalogStore::new();
        for i in 0..5 {
            let p = store.insert_product(product(&format!("Item {i}"))).await.unwrap();
            store.upsert_rating(p.id, UserId::new(), stars(4)).await.unwrap();
        }
        let rows = store.aggregate_rating_buckets(stars(4), 3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.floor_average == 4));
    }
}
