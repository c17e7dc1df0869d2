//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured browser-like headers
//! - Randomized pacing before each fetch
//! - Retry with randomized backoff on transient failures
//! - Detection of block/challenge pages reached through redirects

use crate::config::{Config, FetchConfig, HeaderConfig};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct PageBody {
    /// URL that was requested
    pub url: String,
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Why a single attempt failed
///
/// Every variant is treated as transient and retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Redirected to block page {0}")]
    Anomaly(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Returned once every attempt for a URL has failed
#[derive(Debug, Clone, Error)]
#[error("Giving up on {url} after {attempts} attempt(s): {last}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last: FetchError,
}

/// Anything that can turn a URL into a page body
///
/// The pagination driver only depends on this trait, so it can be driven by
/// canned pages in tests.
#[async_trait]
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<PageBody, FetchFailure>;
}

/// Builds an HTTP client with the configured headers and timeout
///
/// Headers that are not valid HTTP are skipped with a warning; configuration
/// validation normally rejects them earlier.
pub fn build_http_client(
    headers: &HeaderConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(header_map(headers))
        .timeout(fetch.timeout())
        .connect_timeout(fetch.timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

fn header_map(headers: &HeaderConfig) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in &headers.0 {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid header '{}'", name),
        }
    }
    map
}

/// Fetch client with pacing, retries and anomaly detection
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Creates a fetch client from the full configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use listwatch::config::Config;
    /// use listwatch::crawler::FetchClient;
    ///
    /// let client = FetchClient::new(&Config::default()).unwrap();
    /// ```
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.headers, &config.fetch)?;
        Ok(Self::with_client(client, config.fetch.clone()))
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Performs a single GET without retries
    ///
    /// # Returns
    ///
    /// * `Ok(PageBody)` - 2xx response whose final URL carries no block marker
    /// * `Err(FetchError)` - Transport failure, non-2xx status or anomaly redirect
    pub async fn fetch_once(&self, url: &str) -> Result<PageBody, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        if self.is_anomaly(&final_url) {
            return Err(FetchError::Anomaly(final_url));
        }

        let body = response.text().await.map_err(classify_error)?;

        Ok(PageBody {
            url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }

    /// Returns true if the final URL contains one of the block markers
    pub fn is_anomaly(&self, final_url: &str) -> bool {
        let lowered = final_url.to_lowercase();
        self.config
            .anomaly_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
    }
}

#[async_trait]
impl PageSource for FetchClient {
    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx, final URL clean | Return immediately |
    /// | Timeout / connection error | Retry after backoff |
    /// | Non-2xx status | Retry after backoff |
    /// | Final URL has block marker | Retry after backoff |
    /// | `max_attempts` reached | `FetchFailure` |
    async fn fetch(&self, url: &str) -> Result<PageBody, FetchFailure> {
        pause(random_between(self.config.min_delay_ms, self.config.max_delay_ms)).await;

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);

            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        max_attempts,
                        url,
                        error
                    );

                    if attempt >= max_attempts {
                        return Err(FetchFailure {
                            url: url.to_string(),
                            attempts: attempt,
                            last: error,
                        });
                    }

                    pause(random_between(
                        self.config.min_backoff_ms,
                        self.config.max_backoff_ms,
                    ))
                    .await;
                }
            }
        }
    }
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else if let Some(status) = error.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Transport(error.to_string())
    }
}

/// Uniform random duration in `[min_ms, max_ms)`, or `min_ms` when the range is empty
fn random_between(min_ms: u64, max_ms: u64) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..max_ms))
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
