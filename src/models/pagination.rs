//! Page metadata returned alongside paginated reports.

use serde::{Deserialize, Serialize};

use super::Record;

/// Placeholder used for previous/next links that fall outside the page range.
pub const NO_LINK: &str = "#!";

/// One entry of the page-link window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page_number: u64,
    pub is_current: bool,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDetails {
    pub showing_entries: String,
    pub first_page_link: String,
    pub last_page_link: String,
    pub previous_page_link: String,
    pub next_page_link: String,
    pub page_number: u64,
    pub page_size: u64,
    /// Zero-based number of records skipped before this page.
    pub skip: u64,
    pub start_entry: u64,
    pub end_entry: u64,
    pub pagination_links: Vec<PageLink>,
    pub total_pages: u64,
    pub total_records: u64,
    pub total_pages_formatted: String,
    pub total_records_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T = Record> {
    pub results: Vec<T>,
    pub pagination_details: PageDetails,
    pub total_count: u64,
}

impl<T> PaginatedResult<T> {
    /// Transform the page's records, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            results: self.results.into_iter().map(f).collect(),
            pagination_details: self.pagination_details,
            total_count: self.total_count,
        }
    }
}
