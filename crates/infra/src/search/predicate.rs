//! Filter Predicate Builder: one named criterion to one store predicate.

use storefront_catalog::Stars;
use storefront_core::{CategoryId, SubId};

use crate::catalog_store::ProductPredicate;

/// An active search criterion with its decoded value.
///
/// Only criteria that passed the presence rules exist as values of this type;
/// "not supplied" is represented by the absence of a `Criterion`.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Query(String),
    Price { min: f64, max: f64 },
    Category(CategoryId),
    Stars(Stars),
    Sub(SubId),
    Shipping(bool),
    Color(String),
    Brand(String),
}

impl Criterion {
    /// Request field name of the criterion.
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Query(_) => "query",
            Criterion::Price { .. } => "price",
            Criterion::Category(_) => "category",
            Criterion::Stars(_) => "stars",
            Criterion::Sub(_) => "sub",
            Criterion::Shipping(_) => "shipping",
            Criterion::Color(_) => "color",
            Criterion::Brand(_) => "brand",
        }
    }

    /// Predicate fragment for this criterion.
    ///
    /// `stars` maps to a rating-bucket predicate, which the store evaluates in
    /// the same read as the other fragments.
    pub fn predicate(&self) -> ProductPredicate {
        match self {
            Criterion::Query(text) => ProductPredicate::Text(text.clone()),
            Criterion::Price { min, max } => ProductPredicate::PriceBetween { min: *min, max: *max },
            Criterion::Category(id) => ProductPredicate::Category(*id),
            Criterion::Stars(bucket) => ProductPredicate::RatingBucket(*bucket),
            Criterion::Sub(id) => ProductPredicate::HasSub(*id),
            Criterion::Shipping(v) => ProductPredicate::Shipping(*v),
            Criterion::Color(v) => ProductPredicate::Color(v.clone()),
            Criterion::Brand(v) => ProductPredicate::Brand(v.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_criterion_maps_to_its_predicate() {
        let category = CategoryId::new();
        let sub = SubId::new();

        assert_eq!(
            Criterion::Price { min: 0.0, max: 100.0 }.predicate(),
            ProductPredicate::PriceBetween { min: 0.0, max: 100.0 }
        );
        assert_eq!(Criterion::Category(category).predicate(), ProductPredicate::Category(category));
        assert_eq!(Criterion::Sub(sub).predicate(), ProductPredicate::HasSub(sub));
        assert_eq!(
            Criterion::Stars(Stars::new(4).unwrap()).predicate(),
            ProductPredicate::RatingBucket(Stars::new(4).unwrap())
        );
        assert_eq!(
            Criterion::Query("trail".to_string()).predicate(),
            ProductPredicate::Text("trail".to_string())
        );
    }

    #[test]
    fn names_match_request_fields() {
        assert_eq!(Criterion::Shipping(true).name(), "shipping");
        assert_eq!(Criterion::Brand("Asics".to_string()).name(), "brand");
    }
}
