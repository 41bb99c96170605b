//! Reference expansion: resolve `category` and `subs` to `{id, name}`.

use std::collections::{HashMap, HashSet};

use storefront_catalog::{CategoryRef, Product, ProductView, SubRef};
use storefront_core::{CategoryId, SubId};

use crate::catalog_store::{CatalogStore, StoreError};

/// Expand a batch of products with two lookups in total, preserving order.
///
/// Dangling references are dropped from the view.
pub async fn expand_products<S>(store: &S, products: Vec<Product>) -> Result<Vec<ProductView>, StoreError>
where
    S: CatalogStore + ?Sized,
{
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let category_ids: Vec<CategoryId> = products
        .iter()
        .filter_map(|p| p.category)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let sub_ids: Vec<SubId> = products
        .iter()
        .flat_map(|p| p.subs.iter().copied())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let categories: HashMap<CategoryId, CategoryRef> = store
        .find_categories_by_ids(&category_ids)
        .await?
        .iter()
        .map(|c| (c.id, CategoryRef::from(c)))
        .collect();
    let subs: HashMap<SubId, SubRef> = store
        .find_subs_by_ids(&sub_ids)
        .await?
        .iter()
        .map(|s| (s.id, SubRef::from(s)))
        .collect();

    Ok(products
        .into_iter()
        .map(|product| {
            let category = product.category.and_then(|id| categories.get(&id).cloned());
            let expanded_subs = product.subs.iter().filter_map(|id| subs.get(id).cloned()).collect();
            ProductView::new(product, category, expanded_subs)
        })
        .collect())
}

/// Expand a single product.
pub async fn expand_product<S>(store: &S, product: Product) -> Result<ProductView, StoreError>
where
    S: CatalogStore + ?Sized,
{
    let mut views = expand_products(store, vec![product]).await?;
    views
        .pop()
        .ok_or_else(|| StoreError::Backend("expansion dropped a product".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storefront_catalog::{NewCategory, NewProduct, NewSub};
    use storefront_core::{ProductId, SubId};

    use crate::catalog_store::InMemoryCatalogStore;

    #[tokio::test]
    async fn expands_references_and_drops_dangling_ones() {
        let store = InMemoryCatalogStore::new();
        let category = store
            .insert_category(
                NewCategory {
                    name: "Shoes".to_string(),
                }
                .into_category(CategoryId::new(), Utc::now())
                .unwrap(),
            )
            .await
            .unwrap();
        let sub = store
            .insert_sub(
                NewSub {
                    name: "Trail".to_string(),
                    parent: category.id,
                }
                .into_sub(SubId::new(), Utc::now())
                .unwrap(),
            )
            .await
            .unwrap();

        let product = NewProduct {
            title: "Gel Trail".to_string(),
            description: String::new(),
            price: 90.0,
            category: Some(category.id),
            subs: vec![sub.id, SubId::new()],
            quantity: 1,
            shipping: false,
            color: String::new(),
            brand: String::new(),
        }
        .into_product(ProductId::new(), Utc::now())
        .unwrap();

        let view = expand_product(&store, product).await.unwrap();
        assert_eq!(
            view.category,
            Some(CategoryRef {
                id: category.id,
                name: "Shoes".to_string()
            })
        );
        assert_eq!(view.subs.len(), 1);
        assert_eq!(view.subs[0].name, "Trail");
    }
}
