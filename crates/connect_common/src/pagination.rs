//! `offset` / `limit` / `all` list paging shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Paging parameters as they arrive on the query string.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
pub struct PaginationQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub all: Option<bool>,
}

impl PaginationQuery {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Effective limit; `None` means "everything after the offset".
    pub fn limit(&self, page_size: usize) -> Option<usize> {
        if self.all.unwrap_or(false) {
            None
        } else {
            Some(self.limit.unwrap_or(page_size).max(1))
        }
    }
}

/// Returns the requested slice of `items`.
pub fn paginate<T>(items: Vec<T>, query: &PaginationQuery, page_size: usize) -> Vec<T> {
    let offset = if query.all.unwrap_or(false) { 0 } else { query.offset() };
    let iter = items.into_iter().skip(offset);
    match query.limit(page_size) {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// One numbered link under a paged HTML list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageLink {
    pub number: usize,
    pub offset: usize,
    pub active: bool,
}

/// Links for every page of a list of `total` items. Empty when everything
/// fits on one page or when `all` was requested.
pub fn page_links(total: usize, query: &PaginationQuery, page_size: usize) -> Vec<PageLink> {
    let Some(limit) = query.limit(page_size) else {
        return Vec::new();
    };
    if total <= limit {
        return Vec::new();
    }
    let current = query.offset() / limit;
    (0..total.div_ceil(limit))
        .map(|page| PageLink {
            number: page + 1,
            offset: page * limit,
            active: page == current,
        })
        .collect()
}
