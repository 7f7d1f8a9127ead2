//! Pagination types for list endpoints.
//!
//! [`PaginationParams`] describes which page a caller wants and [`PaginatedResult`]
//! carries one page of documents along with navigation metadata.

use serde::{Deserialize, Serialize};

/// A single page of results.
///
/// Serialized in camelCase (`data`, `currentPage`, `totalPages`, `shownResults`).
///
/// ```ignore
/// use docbase::page::{PaginatedResult, PaginationParams};
///
/// let page = PaginatedResult::new(vec!["a", "b"], &PaginationParams::new(1, 2), 5);
///
/// assert_eq!(page.total_pages, 3);
/// assert_eq!(page.shown_results, 2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    /// The items contained in this page.
    pub data: Vec<T>,
    /// The 1-indexed page number.
    pub current_page: usize,
    /// Number of pages needed to show every matching item.
    pub total_pages: usize,
    /// Number of items in `data`.
    pub shown_results: usize,
}

impl<T> PaginatedResult<T> {
    /// Wraps one page of items.
    ///
    /// `total` is the number of items matching the query across all pages.
    pub fn new(data: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        Self {
            shown_results: data.len(),
            data,
            current_page: params.page.max(1),
            total_pages: total.div_ceil(params.limit()),
        }
    }
}

impl<T> Default for PaginatedResult<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            current_page: 1,
            total_pages: 0,
            shown_results: 0,
        }
    }
}

/// Parameters for paginating through large result sets.
///
/// Pages are 1-indexed (page 1 is the first page).
///
/// ```ignore
/// use docbase::page::PaginationParams;
///
/// let params = PaginationParams::new(2, 50);
/// assert_eq!(params.offset(), 50);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    /// Creates new pagination parameters. Pages and page sizes below 1 are raised to 1.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page: page.max(1), per_page: per_page.max(1) }
    }

    /// Creates a new builder for constructing pagination parameters.
    pub fn builder() -> PaginationParamsBuilder {
        PaginationParamsBuilder::new()
    }

    /// Number of items on a full page, never zero.
    pub fn limit(&self) -> usize {
        self.per_page.max(1)
    }

    /// Calculates the number of items to skip for this page.
    ///
    /// Saturates for pages far past the end, which then read as empty.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit())
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

/// Builder for constructing [`PaginationParams`] instances.
pub struct PaginationParamsBuilder {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl PaginationParamsBuilder {
    pub fn new() -> Self {
        Self { page: None, per_page: None }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Builds the parameters, using page=1 and per_page=10 for unset values.
    pub fn build(self) -> PaginationParams {
        PaginationParams::new(self.page.unwrap_or(1), self.per_page.unwrap_or(10))
    }
}

impl Default for PaginationParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
