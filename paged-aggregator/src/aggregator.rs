use crate::cache::ResponseCache;
use crate::filters::FilterState;
use crate::state::CollectionState;
use crate::traits::PageSource;
use crate::types::{FetchOutcome, PreconditionError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Loading flags of the active collection, as a view renders them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStatus {
    pub is_loading: bool,
    pub is_fetching_next: bool,
    pub has_more: bool,
}

impl CollectionStatus {
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_fetching_next
    }

    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.is_busy()
    }
}

impl<T> From<&CollectionState<T>> for CollectionStatus {
    fn from(state: &CollectionState<T>) -> Self {
        Self {
            is_loading: state.is_loading,
            is_fetching_next: state.is_fetching_next,
            has_more: state.has_more,
        }
    }
}

struct Active<T> {
    filters: FilterState,
    epoch: u64,
    state: CollectionState<T>,
}

struct Inner<T> {
    active: Option<Active<T>>,
    epoch: u64,
}

/// Accumulates the pages of one source into a single ordered sequence,
/// keyed by the current filters.
///
/// Every activation of a key gets a new epoch. A response is applied only
/// if the epoch it was issued under is still the active one, so responses
/// for filters the view has moved away from are dropped.
///
/// Items are not deduplicated. If upstream data shifts between page
/// fetches the same item can appear in two pages; callers that need
/// uniqueness must deduplicate the flattened sequence themselves.
pub struct PagedCollectionAggregator<S: PageSource> {
    source: Arc<S>,
    cache: Option<Arc<ResponseCache<S::Item>>>,
    inner: RwLock<Inner<S::Item>>,
}

impl<S: PageSource> PagedCollectionAggregator<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cache: None,
            inner: RwLock::new(Inner { active: None, epoch: 0 }),
        }
    }

    /// Publish pages to, and seed new keys from, a shared cache.
    pub fn with_cache(mut self, cache: Arc<ResponseCache<S::Item>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Entry of `key` in the shared cache, namespaced by the source so
    /// different endpoints never read each other's pages.
    pub fn cache_key(&self, key: &str) -> String {
        format!("{}?{}", self.source.cache_scope(), key)
    }

    pub async fn active_key(&self) -> Option<String> {
        let inner = self.inner.read().await;
        inner.active.as_ref().map(|active| active.state.key.clone())
    }

    pub async fn filters(&self) -> Option<FilterState> {
        let inner = self.inner.read().await;
        inner.active.as_ref().map(|active| active.filters.clone())
    }

    /// Starts a fresh collection unless `filters` already match the
    /// active one.
    pub async fn apply_filters(&self, filters: &FilterState) -> Result<FetchOutcome> {
        let key = filters.derive_key();
        {
            let inner = self.inner.read().await;
            if inner.active.as_ref().is_some_and(|active| active.state.key == key) {
                debug!("Filters unchanged for {:?}", key);
                return Ok(FetchOutcome::Unchanged { key });
            }
        }
        self.fetch_first_page(filters).await
    }

    /// Replaces the active collection with the first page for `filters`.
    pub async fn fetch_first_page(&self, filters: &FilterState) -> Result<FetchOutcome> {
        let key = filters.derive_key();
        let seed = match &self.cache {
            Some(cache) => cache.get(&self.cache_key(&key)).await.map(|entry| entry.pages),
            None => None,
        };

        let epoch = {
            let mut inner = self.inner.write().await;
            inner.epoch += 1;
            let state = match seed {
                Some(pages) => {
                    debug!("Seeding {:?} with {} cached pages", key, pages.len());
                    CollectionState::seeded(key.clone(), pages)
                }
                None => CollectionState::loading(key.clone()),
            };
            let epoch = inner.epoch;
            inner.active = Some(Active {
                filters: filters.clone(),
                epoch,
                state,
            });
            epoch
        };

        debug!("Fetching first page of {} for {:?}", self.source.source_name(), key);
        let result = self.source.fetch_page(filters, None).await;

        let mut inner = self.inner.write().await;
        let Some(active) = inner
            .active
            .as_mut()
            .filter(|active| active.epoch == epoch && active.state.key == key)
        else {
            debug!("Discarding stale first page for {:?}", key);
            return Ok(FetchOutcome::Discarded { key });
        };

        match result {
            Ok(page) => {
                let new_items = page.items.len();
                active.state.apply_first_page(page);
                let has_more = active.state.has_more;
                // Published before the state lock is released so a newer
                // activation cannot be overwritten by this one.
                if let Some(cache) = &self.cache {
                    cache.put(&self.cache_key(&key), active.state.pages.clone()).await;
                }
                drop(inner);

                info!(
                    "Loaded first page of {} for {:?}: {} items, has_more={}",
                    self.source.source_name(),
                    key,
                    new_items,
                    has_more
                );
                Ok(FetchOutcome::Applied { key, new_items, has_more })
            }
            Err(e) => {
                active.state.is_loading = false;
                warn!("First page of {} failed for {:?}: {}", self.source.source_name(), key, e);
                Err(e)
            }
        }
    }

    /// Appends the next page of the active collection.
    ///
    /// Fails with a precondition error when there is nothing more to load
    /// or a fetch for this collection is already running.
    pub async fn fetch_next_page(&self) -> Result<FetchOutcome> {
        let (key, epoch, filters, cursor) = {
            let mut inner = self.inner.write().await;
            let active = inner.active.as_mut().ok_or(PreconditionError::NoActiveCollection)?;
            let cursor = active.state.next_page_cursor()?;
            active.state.is_fetching_next = true;
            (active.state.key.clone(), active.epoch, active.filters.clone(), cursor)
        };

        debug!("Fetching next page of {:?} at cursor {}", key, cursor);
        let result = self.source.fetch_page(&filters, Some(&cursor)).await;

        let mut inner = self.inner.write().await;
        let Some(active) = inner
            .active
            .as_mut()
            .filter(|active| active.epoch == epoch && active.state.key == key)
        else {
            debug!("Discarding stale page for {:?} at cursor {}", key, cursor);
            return Ok(FetchOutcome::Discarded { key });
        };

        match result {
            Ok(page) => {
                let new_items = page.items.len();
                active.state.append_page(page);
                let has_more = active.state.has_more;
                let total = active.state.len();
                if let Some(cache) = &self.cache {
                    cache.put(&self.cache_key(&key), active.state.pages.clone()).await;
                }
                drop(inner);

                info!(
                    "Appended {} items to {:?} ({} total), has_more={}",
                    new_items, key, total, has_more
                );
                Ok(FetchOutcome::Applied { key, new_items, has_more })
            }
            Err(e) => {
                active.state.is_fetching_next = false;
                warn!("Next page of {:?} failed: {}", key, e);
                Err(e)
            }
        }
    }

    /// Re-runs the first page for the active filters.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let filters = self.filters().await.ok_or(PreconditionError::NoActiveCollection)?;
        self.fetch_first_page(&filters).await
    }

    /// Drops the active collection; anything in flight will be discarded.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        inner.active = None;
    }

    /// Every item of the active collection in fetch order.
    pub async fn flatten(&self) -> Vec<S::Item> {
        let inner = self.inner.read().await;
        inner
            .active
            .as_ref()
            .map(|active| active.state.flatten())
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> Option<CollectionState<S::Item>> {
        let inner = self.inner.read().await;
        inner.active.as_ref().map(|active| active.state.clone())
    }

    pub async fn status(&self) -> CollectionStatus {
        let inner = self.inner.read().await;
        inner
            .active
            .as_ref()
            .map(|active| CollectionStatus::from(&active.state))
            .unwrap_or_default()
    }
}
