//! Core HTTP operations with rate limiting and retry logic
//!
//! Signed API calls go through [`HttpHandler`], which rate limits, signs each attempt
//! afresh and backs off exponentially on 429/503 and connection failures when retries
//! are enabled.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Method, StatusCode};
use url::Url;

use crate::app::client::auth::RequestSigner;
use crate::constants::limits;
use crate::errors::{ArchiveError, ArchiveResult};

type DirectLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    signer: RequestSigner,
    rate_limiter: DirectLimiter,
    max_retries: u32,
}

impl HttpHandler {
    /// Creates a new HttpHandler
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::InvalidConfig` if the rate limit is zero
    pub fn new(
        client: Client,
        signer: RequestSigner,
        rate_limit_rps: u32,
        max_retries: u32,
    ) -> ArchiveResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            signer,
            rate_limiter,
            max_retries,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> ArchiveResult<DirectLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps)
            .ok_or_else(|| ArchiveError::InvalidConfig {
                reason: "rate limit must be non-zero".to_string(),
            })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Send a signed request, retrying transient failures up to `max_retries` times
    ///
    /// Any HTTP status is returned to the caller except 429/503 while retries remain.
    pub async fn send_signed(
        &self,
        method: Method,
        url: &Url,
        body: Vec<u8>,
    ) -> ArchiveResult<reqwest::Response> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;

            // Fresh timestamp and token on every attempt
            let signed = self.signer.sign(&method, url, &body)?;
            tracing::debug!("{} {} (date {})", method, url, signed.date());

            let request = signed.apply(self.client.request(method.clone(), url.clone()));
            let request = if body.is_empty() {
                request
            } else {
                request.body(body.clone())
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let transient = status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE;
                    if transient && retries < self.max_retries {
                        retries += 1;
                        let delay = backoff_delay(retries);
                        tracing::warn!(
                            "Archive answered {} for {}. Backing off for {}ms",
                            status.as_u16(),
                            url.path(),
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        self.max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if self.max_retries > 0 => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        self.max_retries,
                        e
                    );
                    return Err(ArchiveError::RetriesExhausted {
                        max_retries: self.max_retries,
                    });
                }
                Err(e) => return Err(ArchiveError::Network(e)),
            }
        }
    }

    /// Plain GET without signing or rate limiting, for presigned download URLs
    pub async fn get_unsigned(&self, url: &Url) -> reqwest::Result<reqwest::Response> {
        self.client.get(url.clone()).send().await
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }
}

/// `RETRY_BASE_DELAY_MS * 2^attempt`, capped at `MAX_RETRY_DELAY_MS`
fn backoff_delay(attempt: u32) -> Duration {
    let delay = limits::RETRY_BASE_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(limits::MAX_RETRY_DELAY_MS))
}
