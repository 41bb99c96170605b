//! Catalog domain module.
//!
//! This crate contains the business rules for products, categories and
//! sub-categories, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage).

pub mod category;
pub mod product;
pub mod rating;
pub mod sub;
pub mod view;

pub use category::{Category, NewCategory};
pub use product::{NewProduct, Product, ProductPatch};
pub use rating::{Rating, RatingChange, Stars};
pub use sub::{NewSub, Sub};
pub use view::{CategoryRef, ProductView, SubRef};
