//! Catalog query engine.
//!
//! ```text
//! SearchFilters ──► active criteria ──► Criterion::predicate ──► store query ──► expand
//!                                 └──► (exclusive stars) RatingAggregator ──┘
//! ```
//!
//! Rating submissions go through `RatingUpsertEngine` independently of search,
//! and full listings through `PaginationResolver`.

pub mod expand;
pub mod facets;
pub mod pagination;
pub mod predicate;
pub mod ratings;

pub use expand::{expand_product, expand_products};
pub use facets::{FacetDispatcher, FacetMode, SearchFilters};
pub use pagination::{PageRequest, PageWindow, PaginationResolver, DEFAULT_PAGE_SIZE};
pub use predicate::Criterion;
pub use ratings::{RatingAggregator, RatingUpsertEngine, DEFAULT_BUCKET_LIMIT};
