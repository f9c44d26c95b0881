pub mod types;
pub mod filters;
pub mod traits;
pub mod state;
pub mod cache;
pub mod aggregator;
pub mod merger;
pub mod fetcher;
pub mod context;
pub mod sources;
pub mod validation;
pub mod signature;

pub use types::*;
pub use filters::{derive_key, FilterName, FilterState, WorkMode};
pub use traits::PageSource;
pub use state::CollectionState;
pub use cache::{CacheEntry, ResponseCache};
pub use aggregator::{CollectionStatus, PagedCollectionAggregator};
pub use merger::{merge, InterleavePolicy, MappedSource, MergeSource, MergedView, MultiSourceItem, MultiSourceMerger, SourceSnapshot};
pub use fetcher::Fetcher;
pub use context::ClientContext;
pub use sources::{MockPageSource, RestCollectionSource};
pub use signature::{SignatureEvent, SignatureFlow, SignatureState};
