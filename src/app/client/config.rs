//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client used for
//! both signed API calls and proxy downloads.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::app::client::auth::SignatureScheme;
use crate::constants::{http, limits};
use crate::errors::{ArchiveError, ArchiveResult};

/// Configuration for the archive client
#[derive(Clone)]
pub struct ClientConfig {
    /// Scheme + host of the archive service, e.g. `https://archive.example.com/`
    pub base_url: Url,
    /// Shared HMAC secret
    pub secret: String,
    /// Signing scheme expected by the endpoints
    pub scheme: SignatureScheme,
    /// Whole-request timeout; `None` lets a stalled call wait indefinitely
    pub request_timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Rate limit (requests per second) across all API calls
    pub rate_limit_rps: u32,
    /// Automatic retries for an API call
    pub max_retries: u32,
    /// User agent header
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("secret", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the target and secret
    pub fn new(base_url: Url, secret: impl Into<String>) -> Self {
        Self {
            base_url,
            secret: secret.into(),
            scheme: SignatureScheme::default(),
            request_timeout: None,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::DEFAULT_MAX_RETRIES,
            user_agent: http::USER_AGENT.to_string(),
        }
    }

    /// Build the base URL from a scheme and hostname (which may carry a port)
    pub fn base_url_for(scheme: &str, hostname: &str) -> ArchiveResult<Url> {
        let raw = format!("{}://{}/", scheme, hostname.trim_end_matches('/'));
        Url::parse(&raw).map_err(|e| ArchiveError::InvalidUrl {
            url: raw,
            error: e.to_string(),
        })
    }

    pub fn with_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rps: u32) -> Self {
        self.rate_limit_rps = rps;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> ArchiveResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(true);

        if let Some(timeout) = self.request_timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(ArchiveError::Network)
    }
}
