//! Listing query state and query-string construction.

use std::collections::BTreeMap;

use freelance_types::listing::{FacetFilters, ListingParams, SortBy, SortOrder, total_pages};

/// Pagination, facets, search and sort for the services listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub filters: FacetFilters,
    pub search_query: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ListingQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_pages: 1,
            total_count: 0,
            filters: FacetFilters::new(),
            search_query: String::new(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Record a completed fetch of `page`. Keeps `current_page` within
    /// `1..=total_pages`.
    pub fn record_page(&mut self, page: u32, page_size: u32, count: u64) {
        self.total_count = count;
        self.total_pages = total_pages(count, page_size);
        self.current_page = page.clamp(1, self.total_pages);
    }

    /// Back to the first page with no known results.
    pub fn reset_paging(&mut self) {
        self.current_page = 1;
        self.total_pages = 1;
        self.total_count = 0;
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Build the `/services/` query for `page`.
///
/// Later layers override earlier ones: store facets, store search, store sort,
/// paging, then every field present in `overrides`. Facet values are
/// comma-joined; empty facets and an empty search are left out.
pub fn build_listing_query(
    query: &ListingQuery,
    page: u32,
    overrides: &ListingParams,
) -> Vec<(String, String)> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();

    insert_facets(&mut merged, &query.filters);
    if !query.search_query.trim().is_empty() {
        merged.insert("search".to_string(), query.search_query.trim().to_string());
    }
    merged.insert("sort_by".to_string(), query.sort_by.to_string());
    merged.insert("sort_order".to_string(), query.sort_order.to_string());
    merged.insert("page".to_string(), page.to_string());
    merged.insert("page_size".to_string(), query.page_size.to_string());

    insert_facets(&mut merged, &overrides.filters);
    if let Some(search) = &overrides.search {
        if search.trim().is_empty() {
            merged.remove("search");
        } else {
            merged.insert("search".to_string(), search.trim().to_string());
        }
    }
    if let Some(sort_by) = overrides.sort_by {
        merged.insert("sort_by".to_string(), sort_by.to_string());
    }
    if let Some(sort_order) = overrides.sort_order {
        merged.insert("sort_order".to_string(), sort_order.to_string());
    }
    if let Some(page_size) = overrides.page_size {
        merged.insert("page_size".to_string(), page_size.max(1).to_string());
    }

    merged.into_iter().collect()
}

fn insert_facets(merged: &mut BTreeMap<String, String>, filters: &FacetFilters) {
    for (facet, values) in filters {
        let values: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            merged.remove(facet);
        } else {
            merged.insert(facet.clone(), values.join(","));
        }
    }
}
