use crate::types::Page;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub pages: Vec<Page<T>>,
    pub written_at: DateTime<Utc>,
}

/// Process-wide response cache keyed by filter key.
///
/// Shared between views through an `Arc`. Writes are last-writer-wins per
/// key; readers always get a copy.
pub struct ResponseCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    max_age: Option<Duration>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age: None,
        }
    }

    /// Entries older than `max_age` are treated as missing.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age: Some(max_age),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if !self.is_expired(entry) {
                return Some(entry.clone());
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| self.is_expired(entry)) {
            debug!("Cache entry for {:?} expired", key);
            entries.remove(key);
        }
        None
    }

    /// Stores `pages` under `key` and drops any entries that have expired.
    pub async fn put(&self, key: &str, pages: Vec<Page<T>>) {
        let mut entries = self.entries.write().await;
        if self.max_age.is_some() {
            let before = entries.len();
            entries.retain(|_, entry| !self.is_expired(entry));
            if entries.len() < before {
                debug!("Evicted {} expired cache entries", before - entries.len());
            }
        }
        debug!("Caching {} pages for {:?}", pages.len(), key);
        entries.insert(
            key.to_string(),
            CacheEntry {
                pages,
                written_at: Utc::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, entry: &CacheEntry<T>) -> bool {
        match self.max_age {
            None => false,
            Some(max_age) => Utc::now().signed_duration_since(entry.written_at) >= max_age,
        }
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
