//! Jikan API client with rate limiting and retry logic.

use super::rate_limiter::RateLimiter;
use super::types::{AnimeResponse, AnimeSummary};
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use shared::config::CatalogConfig;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API, without trailing slash
    base_url: String,
    /// Rate limiter
    rate_limiter: RateLimiter,
    /// Maximum retries for failed requests
    max_retries: u32,
    /// Base delay for retry (exponential backoff)
    retry_delay_ms: u64,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(
        base_url: String,
        requests_per_second: f64,
        requests_per_minute: u32,
        max_retries: u32,
        retry_delay_ms: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("anime-shelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(requests_per_second, requests_per_minute),
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a client from the `[catalog]` configuration section
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.rate_limit.requests_per_second,
            config.rate_limit.requests_per_minute,
            config.max_retries,
            config.retry_delay_ms,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }

    /// Make a GET request with rate limiting and retry logic
    ///
    /// Retries transport errors, 429 and 5xx responses; other statuses fail
    /// immediately.
    async fn get<T: serde::de::DeserializeOwned>(&mut self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);

        for attempt in 0..=self.max_retries {
            self.rate_limiter.acquire().await;

            debug!(url = %url, attempt = attempt + 1, "Making API request");

            let failure = match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("Failed to parse response from {}", url));
                    }

                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        return Err(anyhow!("Request to {} failed with status {}", url, status));
                    }

                    format!("status {}", status)
                }
                Err(e) => e.to_string(),
            };

            if attempt < self.max_retries {
                let delay = self.backoff(attempt);
                warn!(
                    url = %url,
                    error = %failure,
                    delay_ms = delay.as_millis(),
                    "Request failed, retrying"
                );
                sleep(delay).await;
            } else {
                return Err(anyhow!(
                    "Request to {} failed after {} retries: {}",
                    url,
                    self.max_retries,
                    failure
                ));
            }
        }

        Err(anyhow!("Request to {} failed after all retries", url))
    }

    /// Fetch and validate display metadata for an anime
    pub async fn get_anime(&mut self, anime_id: i64) -> Result<AnimeSummary> {
        info!(anime_id = anime_id, "Looking up anime");
        let response: AnimeResponse = self.get(&format!("/anime/{}", anime_id)).await?;

        AnimeSummary::from_payload(anime_id, response)
            .with_context(|| format!("Unusable catalog entry for anime {}", anime_id))
    }
}
