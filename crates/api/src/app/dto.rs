use std::str::FromStr;

use axum::http::StatusCode;
use serde::Deserialize;

use storefront_catalog::{NewProduct, NewSub, ProductPatch};
use storefront_core::{CategoryId, DomainError, DomainResult, SubId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Product creation body. References arrive as strings so a malformed id is
/// reported as `invalid_id` rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subs: Vec<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub shipping: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: String,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> DomainResult<NewProduct> {
        Ok(NewProduct {
            title: self.title,
            description: self.description,
            price: self.price,
            category: self.category.as_deref().map(str::parse::<CategoryId>).transpose()?,
            subs: parse_all(&self.subs)?,
            quantity: self.quantity,
            shipping: self.shipping,
            color: self.color,
            brand: self.brand,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub subs: Option<Vec<String>>,
    pub quantity: Option<u32>,
    pub sold: Option<u32>,
    pub shipping: Option<bool>,
    pub color: Option<String>,
    pub brand: Option<String>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> DomainResult<ProductPatch> {
        Ok(ProductPatch {
            title: self.title,
            description: self.description,
            price: self.price,
            category: self.category.as_deref().map(str::parse::<CategoryId>).transpose()?,
            subs: self.subs.as_deref().map(parse_all).transpose()?,
            quantity: self.quantity,
            sold: self.sold,
            shipping: self.shipping,
            color: self.color,
            brand: self.brand,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub star: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubRequest {
    pub name: String,
    pub parent: String,
}

impl SubRequest {
    pub fn into_new_sub(self) -> DomainResult<NewSub> {
        Ok(NewSub {
            name: self.name,
            parent: self.parent.parse()?,
        })
    }
}

fn parse_all(raw: &[String]) -> DomainResult<Vec<SubId>> {
    raw.iter().map(|s| s.parse()).collect()
}

// -------------------------
// Path helpers / response mapping
// -------------------------

pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_count(raw: &str) -> Result<usize, axum::response::Response> {
    raw.trim().parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "count must be a non-negative integer",
        )
    })
}
