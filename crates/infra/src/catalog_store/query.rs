//! Store-level query vocabulary: predicates, sort keys and page windows.
//!
//! A `ProductQuery` is a conjunction of `ProductPredicate`s plus window
//! options. Adapters either evaluate predicates directly (`matches`) or
//! compile them into their native query language.

use serde::{Deserialize, Serialize};

use storefront_catalog::{Product, Stars};
use storefront_core::{CategoryId, DomainError, ProductId, SubId};

/// One predicate fragment against the product collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductPredicate {
    /// Full-text match against the indexed text fields.
    Text(String),
    /// `min <= price <= max`.
    PriceBetween { min: f64, max: f64 },
    /// Exact category reference.
    Category(CategoryId),
    /// The sub is a member of the product's `subs`.
    HasSub(SubId),
    Shipping(bool),
    Color(String),
    Brand(String),
    /// Floor of the mean star rating equals the bucket. Unrated products never match.
    RatingBucket(Stars),
    /// Identity is one of the given ids.
    IdIn(Vec<ProductId>),
    /// Identity differs from the given id.
    IdNot(ProductId),
}

impl ProductPredicate {
    /// Evaluate the predicate against a single document.
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::Text(q) => product.matches_text(q),
            Self::PriceBetween { min, max } => product.price >= *min && product.price <= *max,
            Self::Category(id) => product.category == Some(*id),
            Self::HasSub(id) => product.subs.contains(id),
            Self::Shipping(v) => product.shipping == *v,
            Self::Color(v) => product.color == *v,
            Self::Brand(v) => product.brand == *v,
            Self::RatingBucket(stars) => product.floor_average() == Some(stars.get()),
            Self::IdIn(ids) => ids.contains(&product.id),
            Self::IdNot(id) => product.id != *id,
        }
    }
}

/// Sortable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Price,
    Sold,
    Quantity,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
            Self::Price => "price",
            Self::Sold => "sold",
            Self::Quantity => "quantity",
        }
    }
}

impl core::str::FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            "title" => Ok(Self::Title),
            "price" => Ok(Self::Price),
            "sold" => Ok(Self::Sold),
            "quantity" => Ok(Self::Quantity),
            other => Err(DomainError::validation(format!("unsupported sort field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl core::str::FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(Self::Asc),
            "desc" | "descending" | "-1" => Ok(Self::Desc),
            other => Err(DomainError::validation(format!("unsupported sort order '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn newest_first() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }

    /// Compare two products by this sort key.
    pub fn compare(&self, a: &Product, b: &Product) -> core::cmp::Ordering {
        let ord = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Sold => a.sold.cmp(&b.sold),
            SortField::Quantity => a.quantity.cmp(&b.quantity),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Conjunctive product query with an optional sort and page window.
///
/// An empty predicate list selects every product. Without a sort the
/// adapter's natural (insertion) order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub predicates: Vec<ProductPredicate>,
    pub sort: Option<Sort>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ProductQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(predicates: Vec<ProductPredicate>) -> Self {
        Self {
            predicates,
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: ProductPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.predicates.iter().all(|p| p.matches(product))
    }
}

/// Output row of the rating-bucket aggregation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAggregate {
    pub product_id: ProductId,
    pub floor_average: u8,
}

/// Acknowledgement of an in-place update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Result of an atomic rating upsert.
///
/// Serializes as the bare product or the bare acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RatingOutcome {
    /// A new rating entry was appended; carries the updated product.
    Added(Product),
    /// The user's existing entry had its star overwritten.
    Updated(UpdateAck),
}
