use crate::filters::FilterState;
use crate::types::{Cursor, Page, Result};
use async_trait::async_trait;

/// A paginated upstream collection (a REST endpoint, a scripted mock, ...).
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Unique identifier for this source
    fn source_id(&self) -> String;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Namespace of this source's entries in a shared `ResponseCache`.
    /// Must be stable across instances that talk to the same upstream.
    fn cache_scope(&self) -> String {
        self.source_id()
    }

    /// Fetch one page. `cursor` is `None` for the first page and otherwise
    /// the previous page's `next`, passed back verbatim.
    async fn fetch_page(&self, filters: &FilterState, cursor: Option<&Cursor>) -> Result<Page<Self::Item>>;
}
