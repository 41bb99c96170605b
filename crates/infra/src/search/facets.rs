//! Facet Dispatcher: decides which criteria are active and runs the search.

use serde::Deserialize;
use tracing::{debug, instrument};

use storefront_catalog::{ProductView, Stars};
use storefront_core::{CategoryId, DomainError, DomainResult, SubId};

use crate::catalog_store::{CatalogStore, ProductQuery};
use crate::error::CatalogError;

use super::expand::expand_products;
use super::predicate::Criterion;
use super::ratings::RatingAggregator;

/// Search request payload. Any subset of the fields may be supplied.
///
/// Presence rules:
/// - `price` is active whenever supplied, so `[0, x]` is a real bound;
/// - `query`, `category`, `sub`, `color`, `brand` are active when non-empty;
/// - `stars` is active when non-zero;
/// - `shipping` is active only when `true`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub price: Option<(f64, f64)>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stars: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub shipping: Option<bool>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchFilters {
    /// Active criteria in evaluation order:
    /// query, price, category, stars, sub, shipping, color, brand.
    ///
    /// A supplied value that cannot be decoded (malformed id, star out of
    /// range, inverted price range) is an error, not an absent criterion.
    pub fn active_criteria(&self) -> DomainResult<Vec<Criterion>> {
        let mut active = Vec::new();

        if let Some(q) = non_empty(&self.query) {
            active.push(Criterion::Query(q.to_string()));
        }
        if let Some((min, max)) = self.price {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(DomainError::validation(format!(
                    "price range must be [min, max] with min <= max, got [{min}, {max}]"
                )));
            }
            active.push(Criterion::Price { min, max });
        }
        if let Some(raw) = non_empty(&self.category) {
            active.push(Criterion::Category(raw.parse::<CategoryId>()?));
        }
        if let Some(stars) = self.stars.filter(|s| *s != 0) {
            active.push(Criterion::Stars(Stars::from_i64(stars)?));
        }
        if let Some(raw) = non_empty(&self.sub) {
            active.push(Criterion::Sub(raw.parse::<SubId>()?));
        }
        if self.shipping == Some(true) {
            active.push(Criterion::Shipping(true));
        }
        if let Some(color) = non_empty(&self.color) {
            active.push(Criterion::Color(color.to_string()));
        }
        if let Some(brand) = non_empty(&self.brand) {
            active.push(Criterion::Brand(brand.to_string()));
        }

        Ok(active)
    }
}

/// How several active criteria combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacetMode {
    /// AND every active criterion into one store query.
    #[default]
    Conjunctive,
    /// Only the last active criterion in evaluation order applies.
    Exclusive,
}

impl core::str::FromStr for FacetMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conjunctive" | "and" => Ok(Self::Conjunctive),
            "exclusive" | "last" => Ok(Self::Exclusive),
            other => Err(DomainError::validation(format!("unknown facet mode '{other}'"))),
        }
    }
}

impl core::fmt::Display for FacetMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Conjunctive => f.write_str("conjunctive"),
            Self::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Runs a faceted search against the catalog store.
///
/// No active criterion yields an empty result. In conjunctive mode a `stars`
/// criterion caps the result at the bucket limit, like the aggregator does.
#[derive(Debug, Clone)]
pub struct FacetDispatcher<S> {
    store: S,
    mode: FacetMode,
    bucket_limit: usize,
    aggregator: RatingAggregator<S>,
}

impl<S> FacetDispatcher<S>
where
    S: CatalogStore + Clone,
{
    pub fn new(store: S, mode: FacetMode, bucket_limit: usize) -> Self {
        Self {
            aggregator: RatingAggregator::new(store.clone(), bucket_limit),
            store,
            mode,
            bucket_limit,
        }
    }

    pub fn mode(&self) -> FacetMode {
        self.mode
    }

    #[instrument(skip(self, filters), fields(mode = %self.mode), err)]
    pub async fn dispatch(&self, filters: &SearchFilters) -> Result<Vec<ProductView>, CatalogError> {
        let criteria = filters.active_criteria()?;
        for criterion in &criteria {
            debug!(criterion = criterion.name(), "facet active");
        }

        match self.mode {
            FacetMode::Conjunctive => self.all_of(&criteria).await,
            FacetMode::Exclusive => match criteria.last() {
                None => Ok(Vec::new()),
                Some(Criterion::Stars(bucket)) => self.aggregator.products_in_bucket(*bucket).await,
                Some(last) => self.all_of(std::slice::from_ref(last)).await,
            },
        }
    }

    async fn all_of(&self, criteria: &[Criterion]) -> Result<Vec<ProductView>, CatalogError> {
        if criteria.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = ProductQuery::matching(criteria.iter().map(Criterion::predicate).collect());
        if criteria.iter().any(|c| matches!(c, Criterion::Stars(_))) {
            query = query.limit(self.bucket_limit);
        }

        let products = self.store.find_products(&query).await?;
        Ok(expand_products(&self.store, products).await?)
    }
}
