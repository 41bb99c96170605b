//! Catalog store boundary.
//!
//! Defines the persistence port for products, categories and subs, the
//! store-level query vocabulary, and two adapters: an in-memory store for
//! tests/dev and a Postgres store.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use query::{
    ProductPredicate, ProductQuery, RatingAggregate, RatingOutcome, Sort, SortField, SortOrder, UpdateAck,
};
pub use r#trait::{CatalogStore, StoreError};
