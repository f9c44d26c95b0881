use crate::context::ClientContext;
use crate::filters::FilterState;
use crate::traits::PageSource;
use crate::types::{CollectionEndpointSpec, CollectionResponse, Cursor, Page, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// A collection endpoint of the REST backend:
/// `GET <endpoint>?<filter-params>&cursor=<opaque>`.
pub struct RestCollectionSource<T> {
    pub source_id: Uuid,
    pub name: Option<String>,
    endpoint: CollectionEndpointSpec,
    context: ClientContext,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestCollectionSource<T> {
    pub fn new(context: ClientContext, endpoint: CollectionEndpointSpec) -> Self {
        Self {
            source_id: Uuid::new_v4(),
            name: None,
            endpoint,
            context,
            _item: PhantomData,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn endpoint(&self) -> &CollectionEndpointSpec {
        &self.endpoint
    }

    /// Filter parameters use the endpoint's documented names; the cursor is
    /// appended verbatim.
    pub fn request_url(&self, filters: &FilterState, cursor: Option<&Cursor>) -> Result<Url> {
        let mut url = self.context.endpoint_url(&self.endpoint.path)?;

        let mut params: Vec<(&str, &str)> = filters
            .iter()
            .map(|(name, value)| (self.endpoint.param_name(name.as_str()), value))
            .collect();
        if let Some(cursor) = cursor {
            params.push((self.endpoint.cursor_param.as_str(), cursor.as_str()));
        }

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

#[async_trait]
impl<T> PageSource for RestCollectionSource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Item = T;

    fn source_id(&self) -> String {
        format!("rest_{}", self.source_id)
    }

    fn source_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("REST collection ({})", self.endpoint.path))
    }

    /// The resolved endpoint, so every instance pointed at the same
    /// collection shares cache entries.
    fn cache_scope(&self) -> String {
        self.context
            .endpoint_url(&self.endpoint.path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.endpoint.path.clone())
    }

    async fn fetch_page(&self, filters: &FilterState, cursor: Option<&Cursor>) -> Result<Page<T>> {
        let url = self.request_url(filters, cursor)?;
        debug!("Requesting {}", url);
        let response: CollectionResponse<T> = self.context.fetcher().get_collection(&url).await?;
        Ok(response.into())
    }
}
