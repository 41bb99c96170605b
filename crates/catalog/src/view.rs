//! Response-side product shape with references expanded to `{id, name}`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_core::{CategoryId, ProductId, SubId};

use crate::category::Category;
use crate::product::Product;
use crate::rating::Rating;
use crate::sub::Sub;

/// Reduced projection of a referenced category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

impl From<&Category> for CategoryRef {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

/// Reduced projection of a referenced sub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubRef {
    pub id: SubId,
    pub name: String,
}

impl From<&Sub> for SubRef {
    fn from(s: &Sub) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
        }
    }
}

/// Product with `category` and `subs` expanded.
///
/// References that no longer resolve are dropped (no cascade on delete).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub category: Option<CategoryRef>,
    pub subs: Vec<SubRef>,
    pub quantity: u32,
    pub sold: u32,
    pub shipping: bool,
    pub color: String,
    pub brand: String,
    pub ratings: Vec<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(product: Product, category: Option<CategoryRef>, subs: Vec<SubRef>) -> Self {
        Self {
            id: product.id,
            title: product.title,
            slug: product.slug,
            description: product.description,
            price: product.price,
            category,
            subs,
            quantity: product.quantity,
            sold: product.sold,
            shipping: product.shipping,
            color: product.color,
            brand: product.brand,
            ratings: product.ratings,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}
