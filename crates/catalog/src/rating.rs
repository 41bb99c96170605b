//! Product ratings and star values.

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, UserId};

/// A star value in `1..=5`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::validation(format!(
                "star must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Build from an untyped request value (negative and oversized values are rejected).
    pub fn from_i64(value: i64) -> Result<Self, DomainError> {
        let narrowed = u8::try_from(value)
            .map_err(|_| DomainError::validation(format!("star must be between 1 and 5, got {value}")))?;
        Self::new(narrowed)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Stars {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stars> for u8 {
    fn from(value: Stars) -> Self {
        value.0
    }
}

impl core::fmt::Display for Stars {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's rating of a product. Owned by the product document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub star: Stars,
    pub posted_by: UserId,
}

/// What a rating submission did to a product's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    /// The user had no rating yet; one was appended.
    Added,
    /// The user's existing rating was overwritten.
    Updated { previous: Stars },
}

/// Floor of the arithmetic mean of the given ratings.
///
/// An empty slice has no mean and therefore no bucket.
pub fn floor_average(ratings: &[Rating]) -> Option<u8> {
    if ratings.is_empty() {
        return None;
    }
    let total: u32 = ratings.iter().map(|r| u32::from(r.star.get())).sum();
    // Integer division floors for non-negative operands.
    let count = u32::try_from(ratings.len()).ok()?;
    u8::try_from(total / count).ok()
}
