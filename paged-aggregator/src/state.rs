use crate::types::{Cursor, Page, PreconditionError};
use chrono::{DateTime, Utc};

/// Accumulated pages for one filter key.
///
/// `pages` only ever grows while the key stays the same; a different key
/// always means a fresh `CollectionState`.
#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    pub key: String,
    pub pages: Vec<Page<T>>,
    pub is_loading: bool,
    pub is_fetching_next: bool,
    pub has_more: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T: Clone> CollectionState<T> {
    /// A state whose first page has been requested but not received.
    pub fn loading(key: String) -> Self {
        Self {
            key,
            pages: Vec::new(),
            is_loading: true,
            is_fetching_next: false,
            has_more: false,
            updated_at: None,
        }
    }

    /// A loading state that renders previously cached pages until the
    /// first page arrives and replaces them.
    pub fn seeded(key: String, pages: Vec<Page<T>>) -> Self {
        let mut state = Self::loading(key);
        state.has_more = pages.last().is_some_and(|page| page.next.is_some());
        state.pages = pages;
        state
    }

    /// Items of every page in fetch order. Never re-sorted.
    pub fn flatten(&self) -> Vec<T> {
        self.pages.iter().flat_map(|page| page.items.iter().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent total reported by the backend.
    pub fn reported_count(&self) -> Option<u64> {
        self.pages.iter().filter_map(|page| page.count).last()
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|page| page.next.as_ref())
    }

    /// Checks that a next-page fetch may start, returning the cursor to
    /// request.
    pub fn next_page_cursor(&self) -> Result<Cursor, PreconditionError> {
        if self.is_loading {
            return Err(PreconditionError::FirstPageLoading);
        }
        if self.is_fetching_next {
            return Err(PreconditionError::FetchInFlight);
        }
        if !self.has_more {
            return Err(PreconditionError::NoMorePages);
        }
        self.next_cursor().cloned().ok_or(PreconditionError::NoMorePages)
    }

    /// Replaces everything with the first page of a fresh lifecycle.
    pub fn apply_first_page(&mut self, page: Page<T>) {
        self.has_more = page.next.is_some();
        self.pages = vec![page];
        self.is_loading = false;
        self.is_fetching_next = false;
        self.updated_at = Some(Utc::now());
    }

    pub fn append_page(&mut self, page: Page<T>) {
        self.has_more = page.next.is_some();
        self.pages.push(page);
        self.is_fetching_next = false;
        self.updated_at = Some(Utc::now());
    }
}
