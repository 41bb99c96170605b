//! Catalog service: the application-level entry point used by the HTTP layer.
//!
//! Composes the store with the query engine:
//!
//! - faceted search goes through [`FacetDispatcher`]
//! - rating submissions go through [`RatingUpsertEngine`]
//! - the paginated listing goes through [`PaginationResolver`]
//! - everything else is a thin lookup/write over [`CatalogStore`]
//!
//! Every operation runs under the configured store timeout. Store failures are
//! logged here once and returned to the caller; nothing is swallowed.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use storefront_catalog::{Category, NewCategory, NewProduct, NewSub, Product, ProductPatch, ProductView, Sub};
use storefront_core::{CategoryId, ProductId, SubId, UserId};

use crate::catalog_store::{CatalogStore, ProductPredicate, ProductQuery, RatingOutcome, Sort};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::search::{
    expand_product, expand_products, FacetDispatcher, PageRequest, PaginationResolver, RatingUpsertEngine,
    SearchFilters,
};

/// Category with the products that reference it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<ProductView>,
}

/// Sub with the products that list it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubDetail {
    pub sub: Sub,
    pub products: Vec<ProductView>,
}

pub type SharedStore = Arc<dyn CatalogStore>;

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
    config: CatalogConfig,
    facets: FacetDispatcher<SharedStore>,
    ratings: RatingUpsertEngine<SharedStore>,
    pages: PaginationResolver,
}

impl CatalogService {
    pub fn new(store: SharedStore, config: CatalogConfig) -> Self {
        Self {
            facets: FacetDispatcher::new(store.clone(), config.facet_mode, config.rating_bucket_limit),
            ratings: RatingUpsertEngine::new(store.clone()),
            pages: PaginationResolver::new(config.page_size),
            store,
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    async fn run<T, F>(&self, operation: &'static str, work: F) -> Result<T, CatalogError>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, work).await {
            Ok(Err(CatalogError::Store(err))) => {
                error!(operation, error = %err, "store operation failed");
                Err(CatalogError::Store(err))
            }
            Ok(result) => result,
            Err(_) => {
                error!(
                    operation,
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "store operation timed out"
                );
                Err(CatalogError::Timeout(self.config.store_timeout))
            }
        }
    }

    /// Referenced category and subs must exist.
    async fn check_references(&self, category: Option<CategoryId>, subs: Option<&[SubId]>) -> Result<(), CatalogError> {
        if let Some(id) = category {
            if self.store.find_category_by_id(id).await?.is_none() {
                return Err(CatalogError::Validation(format!("invalid category '{id}'")));
            }
        }
        if let Some(subs) = subs.filter(|s| !s.is_empty()) {
            let found: HashSet<SubId> = self
                .store
                .find_subs_by_ids(subs)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();
            if let Some(missing) = subs.iter().find(|id| !found.contains(id)) {
                return Err(CatalogError::Validation(format!("invalid sub '{missing}'")));
            }
        }
        Ok(())
    }

    async fn category_exists(&self, id: CategoryId) -> Result<(), CatalogError> {
        self.check_references(Some(id), None).await
    }

    // ---- products ----

    pub async fn create_product(&self, input: NewProduct) -> Result<ProductView, CatalogError> {
        self.run("create_product", async {
            let product = input.into_product(ProductId::new(), Utc::now())?;
            self.check_references(product.category, Some(product.subs.as_slice())).await?;
            let product = self.store.insert_product(product).await?;
            info!(product_id = %product.id, slug = %product.slug, "product created");
            Ok(expand_product(&self.store, product).await?)
        })
        .await
    }

    pub async fn read_product(&self, slug: &str) -> Result<ProductView, CatalogError> {
        self.run("read_product", async {
            let product = self
                .store
                .find_product_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("product '{slug}'")))?;
            Ok(expand_product(&self.store, product).await?)
        })
        .await
    }

    /// Patch a product found by slug. A new title regenerates the slug.
    pub async fn update_product(&self, slug: &str, patch: ProductPatch) -> Result<ProductView, CatalogError> {
        self.run("update_product", async {
            let mut product = self
                .store
                .find_product_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("product '{slug}'")))?;
            self.check_references(patch.category, patch.subs.as_deref()).await?;

            patch.apply(&mut product, Utc::now())?;
            let product = self
                .store
                .update_product(product)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("product '{slug}'")))?;
            info!(product_id = %product.id, slug = %product.slug, "product updated");
            Ok(expand_product(&self.store, product).await?)
        })
        .await
    }

    pub async fn remove_product(&self, slug: &str) -> Result<Product, CatalogError> {
        self.run("remove_product", async {
            let removed = self
                .store
                .delete_product_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("product '{slug}'")))?;
            info!(product_id = %removed.id, slug, "product removed");
            Ok(removed)
        })
        .await
    }

    /// Newest products first, at most `count`.
    pub async fn list_all(&self, count: usize) -> Result<Vec<ProductView>, CatalogError> {
        self.run("list_all", async {
            let query = ProductQuery::all().sorted(Sort::newest_first()).limit(count);
            let products = self.store.find_products(&query).await?;
            Ok(expand_products(&self.store, products).await?)
        })
        .await
    }

    pub async fn list_page(&self, request: &PageRequest) -> Result<Vec<ProductView>, CatalogError> {
        self.run("list_page", async {
            let query = self.pages.resolve(request)?;
            let products = self.store.find_products(&query).await?;
            Ok(expand_products(&self.store, products).await?)
        })
        .await
    }

    /// Approximate number of products.
    pub async fn products_count(&self) -> Result<u64, CatalogError> {
        self.run("products_count", async { Ok(self.store.estimated_product_count().await?) })
            .await
    }

    /// Products in the same category, excluding the product itself.
    ///
    /// A product without a category has no related products.
    pub async fn list_related(&self, product_id: ProductId) -> Result<Vec<ProductView>, CatalogError> {
        self.run("list_related", async {
            let product = self
                .store
                .find_product_by_id(product_id)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("product '{product_id}'")))?;
            let Some(category) = product.category else {
                return Ok(Vec::new());
            };

            let query = ProductQuery::matching(vec![
                ProductPredicate::IdNot(product.id),
                ProductPredicate::Category(category),
            ])
            .limit(self.config.related_limit);
            let products = self.store.find_products(&query).await?;
            Ok(expand_products(&self.store, products).await?)
        })
        .await
    }

    pub async fn search_filters(&self, filters: &SearchFilters) -> Result<Vec<ProductView>, CatalogError> {
        self.run("search_filters", self.facets.dispatch(filters)).await
    }

    pub async fn rate_product(
        &self,
        product_id: ProductId,
        user: UserId,
        star: i64,
    ) -> Result<RatingOutcome, CatalogError> {
        self.run("rate_product", self.ratings.rate(product_id, user, star)).await
    }

    // ---- categories ----

    pub async fn create_category(&self, input: NewCategory) -> Result<Category, CatalogError> {
        self.run("create_category", async {
            let category = input.into_category(CategoryId::new(), Utc::now())?;
            let category = self.store.insert_category(category).await?;
            info!(category_id = %category.id, slug = %category.slug, "category created");
            Ok(category)
        })
        .await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.run("list_categories", async { Ok(self.store.list_categories().await?) })
            .await
    }

    pub async fn read_category(&self, slug: &str) -> Result<CategoryDetail, CatalogError> {
        self.run("read_category", async {
            let category = self
                .store
                .find_category_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("category '{slug}'")))?;
            let products = self
                .store
                .find_products(&ProductQuery::matching(vec![ProductPredicate::Category(category.id)]))
                .await?;
            let products = expand_products(&self.store, products).await?;
            Ok(CategoryDetail { category, products })
        })
        .await
    }

    pub async fn update_category(&self, slug: &str, name: &str) -> Result<Category, CatalogError> {
        self.run("update_category", async {
            let mut category = self
                .store
                .find_category_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("category '{slug}'")))?;
            category.rename(name, Utc::now())?;
            let category = self
                .store
                .update_category(category)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("category '{slug}'")))?;
            info!(category_id = %category.id, slug = %category.slug, "category renamed");
            Ok(category)
        })
        .await
    }

    /// Delete a category. Products keep their (now dangling) reference.
    pub async fn remove_category(&self, slug: &str) -> Result<Category, CatalogError> {
        self.run("remove_category", async {
            let removed = self
                .store
                .delete_category_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("category '{slug}'")))?;
            info!(category_id = %removed.id, slug, "category removed");
            Ok(removed)
        })
        .await
    }

    pub async fn category_subs(&self, category: CategoryId) -> Result<Vec<Sub>, CatalogError> {
        self.run("category_subs", async { Ok(self.store.find_subs_by_parent(category).await?) })
            .await
    }

    // ---- subs ----

    pub async fn create_sub(&self, input: NewSub) -> Result<Sub, CatalogError> {
        self.run("create_sub", async {
            self.category_exists(input.parent).await?;
            let sub = input.into_sub(SubId::new(), Utc::now())?;
            let sub = self.store.insert_sub(sub).await?;
            info!(sub_id = %sub.id, slug = %sub.slug, "sub created");
            Ok(sub)
        })
        .await
    }

    pub async fn list_subs(&self) -> Result<Vec<Sub>, CatalogError> {
        self.run("list_subs", async { Ok(self.store.list_subs().await?) }).await
    }

    pub async fn read_sub(&self, slug: &str) -> Result<SubDetail, CatalogError> {
        self.run("read_sub", async {
            let sub = self
                .store
                .find_sub_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("sub '{slug}'")))?;
            let products = self
                .store
                .find_products(&ProductQuery::matching(vec![ProductPredicate::HasSub(sub.id)]))
                .await?;
            let products = expand_products(&self.store, products).await?;
            Ok(SubDetail { sub, products })
        })
        .await
    }

    pub async fn update_sub(&self, slug: &str, name: &str, parent: CategoryId) -> Result<Sub, CatalogError> {
        self.run("update_sub", async {
            let mut sub = self
                .store
                .find_sub_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("sub '{slug}'")))?;
            self.category_exists(parent).await?;
            sub.update(name, parent, Utc::now())?;
            let sub = self
                .store
                .update_sub(sub)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("sub '{slug}'")))?;
            info!(sub_id = %sub.id, slug = %sub.slug, "sub updated");
            Ok(sub)
        })
        .await
    }

    pub async fn remove_sub(&self, slug: &str) -> Result<Sub, CatalogError> {
        self.run("remove_sub", async {
            let removed = self
                .store
                .delete_sub_by_slug(slug)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("sub '{slug}'")))?;
            info!(sub_id = %removed.id, slug, "sub removed");
            Ok(removed)
        })
        .await
    }
}
