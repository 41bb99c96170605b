//! Catalog engine configuration, read from the environment once at startup.

use std::str::FromStr;
use std::time::Duration;

use crate::search::{FacetMode, DEFAULT_BUCKET_LIMIT, DEFAULT_PAGE_SIZE};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_RELATED_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Upper bound for one service operation (`STORE_TIMEOUT_MS`).
    pub store_timeout: Duration,
    /// `FACET_MODE`: `conjunctive` or `exclusive`.
    pub facet_mode: FacetMode,
    /// `PAGE_SIZE` of the paginated listing.
    pub page_size: usize,
    /// `RATING_BUCKET_LIMIT`: candidates kept per star bucket.
    pub rating_bucket_limit: usize,
    /// `RELATED_LIMIT`: products returned by the related listing.
    pub related_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            facet_mode: FacetMode::default(),
            page_size: DEFAULT_PAGE_SIZE,
            rating_bucket_limit: DEFAULT_BUCKET_LIMIT,
            related_limit: DEFAULT_RELATED_LIMIT,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to the
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            store_timeout: Duration::from_millis(parse_or(
                &lookup,
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )),
            facet_mode: parse_or(&lookup, "FACET_MODE", defaults.facet_mode),
            page_size: positive_or(&lookup, "PAGE_SIZE", defaults.page_size),
            rating_bucket_limit: positive_or(&lookup, "RATING_BUCKET_LIMIT", defaults.rating_bucket_limit),
            related_limit: positive_or(&lookup, "RELATED_LIMIT", defaults.related_limit),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, ?default, "invalid configuration value; using default");
            default
        }),
    }
}

fn positive_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    match parse_or(lookup, key, default) {
        0 => {
            tracing::warn!(key, default, "configuration value must be positive; using default");
            default
        }
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> CatalogConfig {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        CatalogConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), CatalogConfig::default());
        assert_eq!(CatalogConfig::default().page_size, 3);
        assert_eq!(CatalogConfig::default().rating_bucket_limit, 12);
    }

    #[test]
    fn values_are_read() {
        let c = config(&[
            ("STORE_TIMEOUT_MS", "250"),
            ("FACET_MODE", "exclusive"),
            ("PAGE_SIZE", "10"),
        ]);
        assert_eq!(c.store_timeout, Duration::from_millis(250));
        assert_eq!(c.facet_mode, FacetMode::Exclusive);
        assert_eq!(c.page_size, 10);
    }

    #[test]
    fn invalid_values_fall_back() {
        let c = config(&[("FACET_MODE", "sometimes"), ("PAGE_SIZE", "0"), ("RELATED_LIMIT", "-1")]);
        assert_eq!(c.facet_mode, FacetMode::Conjunctive);
        assert_eq!(c.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(c.related_limit, DEFAULT_RELATED_LIMIT);
    }
}
