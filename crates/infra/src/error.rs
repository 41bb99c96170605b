use std::time::Duration;

use thiserror::Error;

use storefront_core::DomainError;

use crate::catalog_store::StoreError;

/// Error returned by the query engine and the catalog service.
///
/// Validation, conflict and not-found errors are detected before any write.
/// `Store` carries the adapter failure unchanged so callers can tell an
/// unreachable backend from a failed statement.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("store did not respond within {0:?}")]
    Timeout(Duration),
}

impl CatalogError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => CatalogError::Validation(msg),
            DomainError::InvalidId(msg) => CatalogError::InvalidId(msg),
            DomainError::Conflict(msg) => CatalogError::Conflict(msg),
            DomainError::NotFound(what) => CatalogError::NotFound(what),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate(msg) => CatalogError::Conflict(msg),
            other => CatalogError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_becomes_conflict() {
        let err = CatalogError::from(StoreError::Duplicate("category name 'Shoes'".to_string()));
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[test]
    fn backend_failure_stays_a_store_error() {
        let err = CatalogError::from(StoreError::Unavailable("pool closed".to_string()));
        assert!(matches!(err, CatalogError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn domain_not_found_keeps_subject() {
        let err = CatalogError::from(DomainError::not_found("product 'x'"));
        assert_eq!(err.to_string(), "product 'x' not found");
    }
}
