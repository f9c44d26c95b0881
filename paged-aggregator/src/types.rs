use serde::{Deserialize, Serialize};
use std::fmt;
// Use the interfaces crate for the wire contract
pub use interfaces::defs::{CollectionEndpointSpec, CollectionResponse, Cursor, ErrorBody, ErrorResponse, FieldErrors};

/// A single fetched batch from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` means the source had no further pages at fetch time.
    pub next: Option<Cursor>,
    /// Total reported by the backend; may be approximate.
    pub count: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next, count: None }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

impl<T> From<CollectionResponse<T>> for Page<T> {
    fn from(response: CollectionResponse<T>) -> Self {
        Self {
            items: response.results,
            next: response.next,
            count: response.count,
        }
    }
}

/// What a fetch did to the visible collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was applied to the active collection.
    Applied { key: String, new_items: usize, has_more: bool },
    /// The active key (or its activation) changed while the request was in
    /// flight; the response was dropped.
    Discarded { key: String },
    /// The filters already match the active collection; nothing was fetched.
    Unchanged { key: String },
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Applied { key, .. } | Self::Discarded { key } | Self::Unchanged { key } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    NoActiveCollection,
    FirstPageLoading,
    FetchInFlight,
    NoMorePages,
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoActiveCollection => "no collection is active",
            Self::FirstPageLoading => "the first page is still loading",
            Self::FetchInFlight => "a next-page fetch is already in flight",
            Self::NoMorePages => "the collection has no more pages",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_response_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub use_system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Paged-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 1,
            max_response_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
            use_system_proxy: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },

    #[error("Backend rejected fields ({status}): {errors:?}")]
    FieldErrors { status: u16, errors: FieldErrors },

    #[error("Precondition failed: {0}")]
    Precondition(PreconditionError),

    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("Invalid value {value:?} for filter {name}")]
    InvalidFilterValue { name: String, value: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Response size exceeds limit: {size_mb}MB")]
    ResponseTooLarge { size_mb: usize },

    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl From<PreconditionError> for AggregatorError {
    fn from(err: PreconditionError) -> Self {
        Self::Precondition(err)
    }
}

impl AggregatorError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
