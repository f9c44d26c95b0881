use crate::types::{AggregatorError, CollectionResponse, ErrorResponse, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// HTTP collaborator for collection endpoints.
///
/// Transport failures and `5xx` responses are retried with exponential
/// backoff up to `max_retries`; `4xx` responses are returned immediately.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn get_collection<T: DeserializeOwned>(&self, url: &Url) -> Result<CollectionResponse<T>> {
        let body = self.get_text(url).await?;
        let response: CollectionResponse<T> = serde_json::from_str(&body)?;
        debug!(
            "Decoded {} results from {} (next: {:?})",
            response.results.len(),
            url,
            response.next
        );
        Ok(response)
    }

    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let start_time = Instant::now();
        let delay = Duration::from_secs(self.config.retry_delay_seconds);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(delay * 60),
            ..Default::default()
        };

        for attempt in 0..=self.config.max_retries {
            let retryable = match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        if let Some(content_length) = response.content_length() {
                            let size_mb = content_length as usize / (1024 * 1024);
                            if size_mb > self.config.max_response_size_mb {
                                return Err(AggregatorError::ResponseTooLarge { size_mb });
                            }
                        }

                        let content = response.text().await?;
                        info!(
                            "Fetched {} ({} bytes) in {}ms",
                            url,
                            content.len(),
                            start_time.elapsed().as_millis()
                        );
                        return Ok(content);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = error_from_response(status, &body);
                    if !status.is_server_error() {
                        return Err(err);
                    }
                    err
                }
                Err(e) => {
                    if !(e.is_timeout() || e.is_connect() || e.is_request()) {
                        return Err(e.into());
                    }
                    AggregatorError::Network(e)
                }
            };

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt + 1, url, retryable, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            error!("Failed to fetch {} after {} attempts: {}", url, attempt + 1, retryable);
            return Err(retryable);
        }

        Err(AggregatorError::General(format!("No response from {}", url)))
    }
}

/// Maps a non-2xx response onto the error taxonomy.
pub fn error_from_response(status: StatusCode, body: &str) -> AggregatorError {
    match ErrorResponse::parse(body) {
        ErrorResponse::Fields(errors) if !errors.is_empty() => AggregatorError::FieldErrors {
            status: status.as_u16(),
            errors,
        },
        ErrorResponse::Detail(body) if !body.detail.is_empty() => AggregatorError::Backend {
            status: status.as_u16(),
            detail: body.detail,
        },
        _ => AggregatorError::Backend {
            status: status.as_u16(),
            detail: status.canonical_reason().unwrap_or("Unknown").to_string(),
        },
    }
}
