//! Page metadata and paginated fetches.

use crate::db::RecordStore;
use crate::models::{Filter, PageDetails, PageLink, PaginatedResult, Record, NO_LINK};

/// Number of page links shown around the current page.
const LINK_WINDOW: u64 = 5;

/// Format an integer with comma thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn page_url(base_url: &str, page_number: u64, page_size: u64) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), page_number, page_size)
}

/// Compute the metadata for one page of `total_records` records.
///
/// `page_number` and `page_size` below 1 are treated as 1. When the page
/// holds no records (no records at all, or a page past the last one) both
/// `start_entry` and `end_entry` are 0, so the range reads "0 to 0" instead
/// of a start past the end such as "1 to 0".
pub fn page_metadata(
    page_number: i64,
    page_size: i64,
    total_records: u64,
    base_url: &str,
) -> PageDetails {
    let page_number = page_number.max(1) as u64;
    let page_size = page_size.max(1) as u64;

    let total_pages = total_records.div_ceil(page_size);
    let skip = (page_number - 1).saturating_mul(page_size);

    let (start_entry, end_entry) = if skip < total_records {
        (skip + 1, skip.saturating_add(page_size).min(total_records))
    } else {
        (0, 0)
    };

    let half = LINK_WINDOW / 2;
    let first = page_number.saturating_sub(half).max(1);
    let last = page_number.saturating_add(half).min(total_pages);
    let pagination_links = (first..=last)
        .map(|n| PageLink {
            page_number: n,
            is_current: n == page_number,
            text: n.to_string(),
            url: page_url(base_url, n, page_size),
        })
        .collect();

    let previous_page_link = if page_number > 1 {
        page_url(base_url, page_number - 1, page_size)
    } else {
        NO_LINK.to_string()
    };
    let next_page_link = if page_number < total_pages {
        page_url(base_url, page_number + 1, page_size)
    } else {
        NO_LINK.to_string()
    };

    PageDetails {
        showing_entries: format!(
            "Showing {} to {} of {} entries",
            group_thousands(start_entry),
            group_thousands(end_entry),
            group_thousands(total_records)
        ),
        first_page_link: page_url(base_url, 1, page_size),
        last_page_link: page_url(base_url, total_pages.max(1), page_size),
        previous_page_link,
        next_page_link,
        page_number,
        page_size,
        skip,
        start_entry,
        end_entry,
        pagination_links,
        total_pages,
        total_records,
        total_pages_formatted: group_thousands(total_pages),
        total_records_formatted: group_thousands(total_records),
    }
}

/// One page of records from `collection`.
pub async fn fetch_page_of_records(
    store: &RecordStore,
    collection: &str,
    page_number: i64,
    page_size: i64,
    filter: &Filter,
) -> Vec<Record> {
    store.fetch_page(collection, page_number, page_size, filter).await
}

/// A page of records with its total count and page metadata.
pub async fn paginated_result(
    store: &RecordStore,
    collection: &str,
    page_number: i64,
    page_size: i64,
    base_url: &str,
    filter: &Filter,
) -> PaginatedResult {
    let (results, total_count) = futures::join!(
        fetch_page_of_records(store, collection, page_number, page_size, filter),
        store.count(collection, filter),
    );

    PaginatedResult {
        results,
        pagination_details: page_metadata(page_number, page_size, total_count, base_url),
        total_count,
    }
}
