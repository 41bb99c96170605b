use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult, Entity, SubId};

use crate::category::validated_name;

/// Sub-category; belongs to exactly one parent category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sub {
    pub id: SubId,
    pub name: String,
    pub slug: String,
    pub parent: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sub {
    /// Rename (slug regenerated) and re-parent the sub.
    pub fn update(&mut self, name: &str, parent: CategoryId, now: DateTime<Utc>) -> DomainResult<()> {
        let (name, slug) = validated_name(name)?;
        self.name = name;
        self.slug = slug;
        self.parent = parent;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Sub {
    type Id = SubId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }
}

/// Input for creating a sub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSub {
    pub name: String,
    pub parent: CategoryId,
}

impl NewSub {
    pub fn into_sub(self, id: SubId, now: DateTime<Utc>) -> DomainResult<Sub> {
        let (name, slug) = validated_name(&self.name)?;
        Ok(Sub {
            id,
            name,
            slug,
            parent: self.parent,
            created_at: now,
            updated_at: now,
        })
    }
}
