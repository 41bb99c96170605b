//! Pagination/Sort Resolver for the full product listing.

use serde::Deserialize;

use storefront_core::DomainResult;

use crate::catalog_store::{ProductQuery, Sort, SortField, SortOrder};

/// Default number of products per page.
pub const DEFAULT_PAGE_SIZE: usize = 3;

/// Listing request body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    /// Sort field name (`createdAt`, `price`, ...). Defaults to `createdAt`.
    #[serde(default)]
    pub sort: Option<String>,
    /// `asc`/`desc` (or `1`/`-1`). Defaults to `desc`.
    #[serde(default)]
    pub order: Option<String>,
    /// 1-indexed page; missing or 0 means the first page.
    #[serde(default)]
    pub page: Option<u64>,
}

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: usize,
    pub limit: usize,
}

impl PageWindow {
    pub fn for_page(page: u64, page_size: usize) -> Self {
        let index = usize::try_from(page.max(1) - 1).unwrap_or(usize::MAX);
        Self {
            skip: index.saturating_mul(page_size),
            limit: page_size,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationResolver {
    page_size: usize,
}

impl Default for PaginationResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationResolver {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Turn a listing request into a sorted, windowed query over all products.
    ///
    /// Unknown sort fields or directions are validation errors.
    pub fn resolve(&self, request: &PageRequest) -> DomainResult<ProductQuery> {
        let field = match request.sort.as_deref().map(str::trim) {
            None | Some("") => SortField::CreatedAt,
            Some(name) => name.parse()?,
        };
        let order = match request.order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::Desc,
            Some(raw) => raw.parse()?,
        };
        let window = PageWindow::for_page(request.page.unwrap_or(1), self.page_size);

        Ok(ProductQuery::all()
            .sorted(Sort { field, order })
            .skip(window.skip)
            .limit(window.limit))
    }
}
