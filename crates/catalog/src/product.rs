use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{slugify, CategoryId, DomainError, DomainResult, Entity, ProductId, SubId, UserId};

use crate::rating::{floor_average, Rating, RatingChange, Stars};

/// Product document.
///
/// The ratings sequence is owned by the product and holds at most one entry
/// per `posted_by`; `apply_rating` is the only way entries are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub category: Option<CategoryId>,
    pub subs: Vec<SubId>,
    pub quantity: u32,
    pub sold: u32,
    pub shipping: bool,
    pub color: String,
    pub brand: String,
    pub ratings: Vec<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The rating left by `user`, if any.
    pub fn rating_by(&self, user: UserId) -> Option<&Rating> {
        self.ratings.iter().find(|r| r.posted_by == user)
    }

    /// Insert-or-update the rating of `user`.
    pub fn apply_rating(&mut self, user: UserId, star: Stars, now: DateTime<Utc>) -> RatingChange {
        let change = match self.ratings.iter_mut().find(|r| r.posted_by == user) {
            Some(existing) => {
                let previous = existing.star;
                existing.star = star;
                RatingChange::Updated { previous }
            }
            None => {
                self.ratings.push(Rating {
                    star,
                    posted_by: user,
                });
                RatingChange::Added
            }
        };
        self.updated_at = now;
        change
    }

    /// Floor of the mean star value; `None` while unrated.
    pub fn floor_average(&self) -> Option<u8> {
        floor_average(&self.ratings)
    }

    /// Case-insensitive token match: every query term must equal a word of
    /// the title or description. Words are split on non-alphanumerics.
    pub fn matches_text(&self, query: &str) -> bool {
        let words: HashSet<String> = tokens(&self.title)
            .chain(tokens(&self.description))
            .map(str::to_lowercase)
            .collect();
        let mut terms = tokens(query).peekable();
        if terms.peek().is_none() {
            return false;
        }
        terms.all(|term| words.contains(&term.to_lowercase()))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub subs: Vec<SubId>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub shipping: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: String,
}

impl NewProduct {
    /// Validate the input and build the product document (slug derived from title).
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> DomainResult<Product> {
        let title = self.title.trim().to_string();
        let slug = validated_slug(&title)?;
        validate_price(self.price)?;

        Ok(Product {
            id,
            title,
            slug,
            description: self.description,
            price: self.price,
            category: self.category,
            subs: self.subs,
            quantity: self.quantity,
            sold: 0,
            shipping: self.shipping,
            color: self.color,
            brand: self.brand,
            ratings: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a product; absent fields are left untouched.
///
/// Ratings are deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<CategoryId>,
    pub subs: Option<Vec<SubId>>,
    pub quantity: Option<u32>,
    pub sold: Option<u32>,
    pub shipping: Option<bool>,
    pub color: Option<String>,
    pub brand: Option<String>,
}

impl ProductPatch {
    /// Apply the patch; a new title regenerates the slug.
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            product.slug = validated_slug(&title)?;
            product.title = title;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(v) = self.description {
            product.description = v;
        }
        if let Some(v) = self.category {
            product.category = Some(v);
        }
        if let Some(v) = self.subs {
            product.subs = v;
        }
        if let Some(v) = self.quantity {
            product.quantity = v;
        }
        if let Some(v) = self.sold {
            product.sold = v;
        }
        if let Some(v) = self.shipping {
            product.shipping = v;
        }
        if let Some(v) = self.color {
            product.color = v;
        }
        if let Some(v) = self.brand {
            product.brand = v;
        }
        product.updated_at = now;
        Ok(())
    }
}

fn validated_slug(title: &str) -> DomainResult<String> {
    if title.is_empty() {
        return Err(DomainError::validation("title cannot be empty"));
    }
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(DomainError::validation("title must contain at least one letter or digit"));
    }
    Ok(slug)
}

fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn new_product(title: &str) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: "Lightweight trail runner".to_string(),
            price: 89.5,
            category: Some(CategoryId::new()),
            subs: vec![SubId::new()],
            quantity: 10,
            shipping: true,
            color: "Black".to_string(),
            brand: "Asics".to_string(),
        }
    }

    fn product() -> Product {
        new_product("Gel Trail 5").into_product(ProductId::new(), Utc::now()).unwrap()
    }

    #[test]
    fn create_derives_slug_from_title() {
        let p = product();
        assert_eq!(p.slug, "gel-trail-5");
        assert!(p.ratings.is_empty());
        assert_eq!(p.sold, 0);
    }

    #[test]
    fn create_rejects_empty_title() {
        let err = new_product("   ").into_product(ProductId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_negative_price() {
        let mut input = new_product("Sock");
        input.price = -1.0;
        let err = input.into_product(ProductId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn patch_title_regenerates_slug() {
        let mut p = product();
        let patch = ProductPatch {
            title: Some("Gel Trail 6 GTX".to_string()),
            ..Default::default()
        };
        patch.apply(&mut p, Utc::now()).unwrap();
        assert_eq!(p.title, "Gel Trail 6 GTX");
        assert_eq!(p.slug, "gel-trail-6-gtx");
    }

    #[test]
    fn patch_without_title_keeps_slug() {
        let mut p = product();
        let patch = ProductPatch {
            price: Some(10.0),
            color: Some("Red".to_string()),
            ..Default::default()
        };
        patch.apply(&mut p, Utc::now()).unwrap();
        assert_eq!(p.slug, "gel-trail-5");
        assert_eq!(p.price, 10.0);
        assert_eq!(p.color, "Red");
    }

    #[test]
    fn rating_twice_keeps_single_entry_with_latest_star() {
        let mut p = product();
        let user = UserId::new();

        assert_eq!(p.apply_rating(user, Stars::new(4).unwrap(), Utc::now()), RatingChange::Added);
        assert_eq!(
            p.apply_rating(user, Stars::new(2).unwrap(), Utc::now()),
            RatingChange::Updated {
                previous: Stars::new(4).unwrap()
            }
        );

        assert_eq!(p.ratings.len(), 1);
        assert_eq!(p.rating_by(user).unwrap().star.get(), 2);
    }

    #[test]
    fn text_match_requires_all_terms() {
        let p = product();
        assert!(p.matches_text("gel RUNNER"));
        assert!(!p.matches_text("gel road"));
        assert!(!p.matches_text("   "));
    }

    #[test]
    fn text_match_is_whole_word() {
        let mut input = new_product("Chatter Box");
        input.description = "Angel figurine, hand-painted".to_string();
        let p = input.into_product(ProductId::new(), Utc::now()).unwrap();

        assert!(!p.matches_text("hat"));
        assert!(!p.matches_text("gel"));
        assert!(p.matches_text("chatter"));
        assert!(p.matches_text("ANGEL painted"));
    }

    proptest! {
        #[test]
        fn at_most_one_rating_per_user(submissions in proptest::collection::vec((0usize..4, 1u8..=5), 0..40)) {
            let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
            let mut p = product();

            for (who, star) in &submissions {
                p.apply_rating(users[*who], Stars::new(*star).unwrap(), Utc::now());
            }

            for user in &users {
                let count = p.ratings.iter().filter(|r| r.posted_by == *user).count();
                prop_assert!(count <= 1);
                let last = submissions.iter().rev().find(|(who, _)| users[*who] == *user);
                prop_assert_eq!(p.rating_by(*user).map(|r| r.star.get()), last.map(|(_, s)| *s));
            }
        }
    }
}
