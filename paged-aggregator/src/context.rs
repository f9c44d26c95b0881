use crate::fetcher::Fetcher;
use crate::types::{FetchConfig, Result};
use std::sync::Arc;
use url::Url;

/// Everything a REST source needs from the application root.
///
/// Created once where the application starts and handed to each source;
/// cloning shares the same HTTP client.
#[derive(Clone)]
pub struct ClientContext {
    fetcher: Arc<Fetcher>,
    base_url: Url,
}

impl ClientContext {
    pub fn new(base_url: &str, config: FetchConfig) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(config)?);
        Ok(Self::from_parts(fetcher, Url::parse(base_url)?))
    }

    pub fn from_parts(fetcher: Arc<Fetcher>, mut base_url: Url) -> Self {
        // Url::join drops the last segment of a base without a trailing slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { fetcher, base_url }
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}
