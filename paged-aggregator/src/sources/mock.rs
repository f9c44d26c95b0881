use crate::filters::FilterState;
use crate::traits::PageSource;
use crate::types::{AggregatorError, Cursor, Page, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;

type RequestKey = (String, Option<String>);

enum Scripted<T> {
    Page(Page<T>),
    Failure { status: u16, detail: String },
}

/// Scripted page source for development and testing.
///
/// Responses are keyed by filter key and cursor. A gate holds a request
/// until it is opened, which lets a caller change filters while a fetch is
/// still in flight.
pub struct MockPageSource<T> {
    name: String,
    responses: HashMap<RequestKey, Scripted<T>>,
    gates: Mutex<HashMap<RequestKey, Arc<Notify>>>,
    requests: Mutex<Vec<RequestKey>>,
    calls: AtomicUsize,
}

fn request_key(filters: &FilterState, cursor: Option<&str>) -> RequestKey {
    (filters.derive_key(), cursor.map(str::to_string))
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> MockPageSource<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page(mut self, filters: &FilterState, cursor: Option<&str>, page: Page<T>) -> Self {
        self.responses.insert(request_key(filters, cursor), Scripted::Page(page));
        self
    }

    pub fn with_failure(mut self, filters: &FilterState, cursor: Option<&str>, status: u16, detail: impl Into<String>) -> Self {
        self.responses.insert(
            request_key(filters, cursor),
            Scripted::Failure {
                status,
                detail: detail.into(),
            },
        );
        self
    }

    /// Holds requests for `(filters, cursor)` until `notify_one` is called
    /// on the returned handle.
    pub fn gate(&self, filters: &FilterState, cursor: Option<&str>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        lock(&self.gates).insert(request_key(filters, cursor), notify.clone());
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(filter key, cursor)` of every request, in arrival order.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl<T> PageSource for MockPageSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn source_id(&self) -> String {
        format!("mock_{}", self.name)
    }

    fn source_name(&self) -> String {
        format!("Mock ({})", self.name)
    }

    async fn fetch_page(&self, filters: &FilterState, cursor: Option<&Cursor>) -> Result<Page<T>> {
        let key = request_key(filters, cursor.map(Cursor::as_str));
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(key.clone());

        let gate = lock(&self.gates).get(&key).cloned();
        if let Some(gate) = gate {
            debug!("Holding request {:?} until released", key);
            gate.notified().await;
        }

        match self.responses.get(&key) {
            Some(Scripted::Page(page)) => Ok(page.clone()),
            Some(Scripted::Failure { status, detail }) => Err(AggregatorError::Backend {
                status: *status,
                detail: detail.clone(),
            }),
            None => Err(AggregatorError::Backend {
                status: 404,
                detail: format!("No scripted page for {:?}", key),
            }),
        }
    }
}
