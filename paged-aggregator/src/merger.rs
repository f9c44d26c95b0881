use crate::aggregator::{CollectionStatus, PagedCollectionAggregator};
use crate::filters::FilterState;
use crate::traits::PageSource;
use crate::types::{FetchOutcome, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Normalised envelope for items of heterogeneous sources. Only used at
/// merge time; `payload` keeps the original shape for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSourceItem<P> {
    pub source_id: String,
    pub sort_key: Option<DateTime<Utc>>,
    pub payload: P,
}

/// How items of different sources are ordered relative to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterleavePolicy {
    /// Grouped by source, sources in registration order, each source in
    /// its own upstream order. Sources paginate independently, so a true
    /// chronological merge would need every page of every source first;
    /// this policy does not attempt one.
    #[default]
    SourcePriority,
    /// Stable sort on `sort_key`, newest first, keyless items last.
    SortKeyDescending,
}

/// Items and flags of one source at merge time.
#[derive(Debug, Clone)]
pub struct SourceSnapshot<P> {
    pub source_id: String,
    pub items: Vec<MultiSourceItem<P>>,
    pub is_loading: bool,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct MergedView<P> {
    pub items: Vec<MultiSourceItem<P>>,
    pub is_loading: bool,
    pub has_more: bool,
}

impl<P> MergedView<P> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn payloads(&self) -> impl Iterator<Item = &P> {
        self.items.iter().map(|item| &item.payload)
    }
}

/// Combines the current snapshots of several sources into one view.
///
/// The view is loading if any source is loading and has more if any
/// source has more.
pub fn merge<P>(snapshots: Vec<SourceSnapshot<P>>, policy: InterleavePolicy) -> MergedView<P> {
    let is_loading = snapshots.iter().any(|snapshot| snapshot.is_loading);
    let has_more = snapshots.iter().any(|snapshot| snapshot.has_more);
    let mut items: Vec<MultiSourceItem<P>> = snapshots.into_iter().flat_map(|snapshot| snapshot.items).collect();

    if policy == InterleavePolicy::SortKeyDescending {
        items.sort_by(|a, b| match (a.sort_key, b.sort_key) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    MergedView {
        items,
        is_loading,
        has_more,
    }
}

/// One independently paginated input of a `MultiSourceMerger`.
#[async_trait]
pub trait MergeSource<P: Send + 'static>: Send + Sync {
    fn source_id(&self) -> String;

    async fn snapshot(&self) -> SourceSnapshot<P>;

    async fn can_load_more(&self) -> bool;

    async fn load_more(&self) -> Result<FetchOutcome>;

    async fn apply_filters(&self, filters: &FilterState) -> Result<FetchOutcome>;
}

type PayloadFn<I, P> = Box<dyn Fn(&I) -> P + Send + Sync>;
type SortKeyFn<I> = Box<dyn Fn(&I) -> Option<DateTime<Utc>> + Send + Sync>;

/// Exposes an aggregator as a merge source, mapping its items into the
/// merger's payload type.
pub struct MappedSource<S: PageSource, P> {
    source_id: String,
    aggregator: Arc<PagedCollectionAggregator<S>>,
    to_payload: PayloadFn<S::Item, P>,
    sort_key: Option<SortKeyFn<S::Item>>,
}

impl<S: PageSource, P> MappedSource<S, P> {
    pub fn new(
        source_id: impl Into<String>,
        aggregator: Arc<PagedCollectionAggregator<S>>,
        to_payload: impl Fn(&S::Item) -> P + Send + Sync + 'static,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            aggregator,
            to_payload: Box::new(to_payload),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Fn(&S::Item) -> Option<DateTime<Utc>> + Send + Sync + 'static) -> Self {
        self.sort_key = Some(Box::new(sort_key));
        self
    }

    pub fn aggregator(&self) -> &Arc<PagedCollectionAggregator<S>> {
        &self.aggregator
    }
}

#[async_trait]
impl<S, P> MergeSource<P> for MappedSource<S, P>
where
    S: PageSource + 'static,
    P: Send + 'static,
{
    fn source_id(&self) -> String {
        self.source_id.clone()
    }

    async fn snapshot(&self) -> SourceSnapshot<P> {
        // Items and flags come from one read of the aggregator.
        let Some(state) = self.aggregator.snapshot().await else {
            return SourceSnapshot {
                source_id: self.source_id.clone(),
                items: Vec::new(),
                is_loading: false,
                has_more: false,
            };
        };

        let status = CollectionStatus::from(&state);
        let items = state
            .pages
            .iter()
            .flat_map(|page| page.items.iter())
            .map(|item| MultiSourceItem {
                source_id: self.source_id.clone(),
                sort_key: self.sort_key.as_ref().and_then(|sort_key| sort_key(item)),
                payload: (self.to_payload)(item),
            })
            .collect();

        SourceSnapshot {
            source_id: self.source_id.clone(),
            items,
            is_loading: status.is_busy(),
            has_more: status.has_more,
        }
    }

    async fn can_load_more(&self) -> bool {
        self.aggregator.status().await.can_load_more()
    }

    async fn load_more(&self) -> Result<FetchOutcome> {
        self.aggregator.fetch_next_page().await
    }

    async fn apply_filters(&self, filters: &FilterState) -> Result<FetchOutcome> {
        self.aggregator.apply_filters(filters).await
    }
}

/// Presents several independently paginated sources as one sequence.
/// Each source keeps its own aggregator and pagination lifecycle.
pub struct MultiSourceMerger<P: Send + 'static> {
    sources: Vec<Box<dyn MergeSource<P>>>,
    policy: InterleavePolicy,
}

impl<P: Send + 'static> MultiSourceMerger<P> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            policy: InterleavePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InterleavePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sources added earlier come first under `SourcePriority`.
    pub fn add_source(&mut self, source: Box<dyn MergeSource<P>>) {
        info!("Adding source to merger: {}", source.source_id());
        self.sources.push(source);
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|source| source.source_id()).collect()
    }

    pub async fn merged(&self) -> MergedView<P> {
        let snapshots = join_all(self.sources.iter().map(|source| source.snapshot())).await;
        merge(snapshots, self.policy)
    }

    /// Requests the next page of every source that has more and is idle.
    pub async fn load_more(&self) -> Vec<(String, Result<FetchOutcome>)> {
        let mut ready = Vec::new();
        for source in &self.sources {
            if source.can_load_more().await {
                ready.push(source);
            } else {
                debug!("Source {} has nothing to load", source.source_id());
            }
        }

        join_all(ready.into_iter().map(|source| async move {
            (source.source_id(), source.load_more().await)
        }))
        .await
    }

    pub async fn apply_filters(&self, filters: &FilterState) -> Vec<(String, Result<FetchOutcome>)> {
        join_all(self.sources.iter().map(|source| async move {
            (source.source_id(), source.apply_filters(filters).await)
        }))
        .await
    }
}

impl<P: Send + 'static> Default for MultiSourceMerger<P> {
    fn default() -> Self {
        Self::new()
    }
}
