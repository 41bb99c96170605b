use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{slugify, CategoryId, DomainError, DomainResult, Entity};

/// Category. Names are unique across all categories; the store checks that
/// at creation and rename time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Rename the category and regenerate its slug.
    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let (name, slug) = validated_name(name)?;
        self.name = name;
        self.slug = slug;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn into_category(self, id: CategoryId, now: DateTime<Utc>) -> DomainResult<Category> {
        let (name, slug) = validated_name(&self.name)?;
        Ok(Category {
            id,
            name,
            slug,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Trimmed name and its slug, shared by categories and subs.
pub(crate) fn validated_name(raw: &str) -> DomainResult<(String, String)> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(DomainError::validation("name must contain at least one letter or digit"));
    }
    Ok((name.to_string(), slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_derives_slug() {
        let c = NewCategory {
            name: "Shoes".to_string(),
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap();
        assert_eq!(c.name, "Shoes");
        assert_eq!(c.slug, "shoes");
    }

    #[test]
    fn rename_regenerates_slug() {
        let mut c = NewCategory {
            name: "Shoes".to_string(),
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap();

        c.rename(" Running Shoes ", Utc::now()).unwrap();
        assert_eq!(c.name, "Running Shoes");
        assert_eq!(c.slug, "running-shoes");

        let slug_before = c.slug.clone();
        c.rename("Running Shoes", Utc::now()).unwrap();
        assert_eq!(c.slug, slug_before);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = NewCategory {
            name: "  ".to_string(),
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
