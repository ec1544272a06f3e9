//! HTTP client for the media archive
//!
//! [`ArchiveClient`] issues the signed API calls the pipeline needs and downloads proxy
//! content. It holds no ambient state: everything comes in through [`ClientConfig`].
//!
//! The module is organized into specialized components:
//! - `config`: client configuration and building
//! - `auth`: HMAC request signing
//! - `http`: signed requests with rate limiting and optional retries
//! - `download`: streaming downloads with atomic writes

use std::path::Path;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::app::content_id::ContentId;
use crate::app::models::{ProxyDescriptor, ProxyListing, ProxyType};
use crate::constants::archive;
use crate::errors::{ArchiveError, ArchiveResult, DownloadResult};

pub mod auth;
pub mod config;
pub mod download;
pub mod http;

pub use auth::{RequestSigner, SignatureScheme, SignedRequest};
pub use config::ClientConfig;

use download::DownloadHandler;
use http::HttpHandler;

/// Body of the playable endpoint
#[derive(Debug, Deserialize)]
struct PlayableResponse {
    uri: String,
}

/// Client for the archive's verify / proxy APIs
#[derive(Debug)]
pub struct ArchiveClient {
    http_handler: HttpHandler,
    base_url: Url,
}

impl ArchiveClient {
    /// Creates a new ArchiveClient
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the secret is unusable, the rate limit is zero, or the HTTP
    /// client cannot be built
    pub fn new(config: ClientConfig) -> ArchiveResult<Self> {
        let signer = RequestSigner::new(config.secret.clone(), config.scheme)?;
        let client = config.build_http_client()?;
        let http_handler =
            HttpHandler::new(client, signer, config.rate_limit_rps, config.max_retries)?;

        tracing::info!(
            "Created archive client for {} ({:?} signing)",
            config.base_url,
            config.scheme
        );

        Ok(Self {
            http_handler,
            base_url: config.base_url,
        })
    }

    /// Get the base URL of the archive
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `/api/<segments...>`, percent-encoding each segment
    fn api_url(&self, segments: &[&str]) -> ArchiveResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ArchiveError::InvalidUrl {
                    url: self.base_url.to_string(),
                    error: "base URL cannot carry a path".to_string(),
                })?;
            path.clear().push(archive::API_PREFIX);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Check whether the archive knows about an asset
    ///
    /// # Errors
    ///
    /// Any status other than 200 or 404 is returned as `ArchiveError::Remote`
    pub async fn verify_exists(&self, id: &ContentId) -> ArchiveResult<bool> {
        let url = self.api_url(&["validate", id.as_str()])?;
        let response = self
            .http_handler
            .send_signed(Method::GET, &url, Vec::new())
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(remote_error(status, response).await),
        }
    }

    /// List the proxies registered for an asset
    ///
    /// A 200 whose body cannot be decoded is logged and treated as an empty listing.
    ///
    /// # Errors
    ///
    /// Non-200 statuses and connection failures
    pub async fn list_proxies(&self, id: &ContentId) -> ArchiveResult<Vec<ProxyDescriptor>> {
        let url = self.api_url(&["proxy", id.as_str(), "all"])?;
        let response = self
            .http_handler
            .send_signed(Method::GET, &url, Vec::new())
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(remote_error(status, response).await);
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<ProxyListing>(&body) {
            Ok(listing) => {
                tracing::debug!(
                    "{} proxies listed for {} (entryCount {})",
                    listing.entries.len(),
                    id,
                    listing.entry_count
                );
                Ok(listing.entries)
            }
            Err(e) => {
                tracing::warn!("Could not decode proxy listing for {}: {}", id, e);
                Ok(Vec::new())
            }
        }
    }

    /// Ask the archive to generate a proxy; generation itself happens asynchronously
    ///
    /// # Errors
    ///
    /// Non-200 statuses and connection failures
    pub async fn request_generation(
        &self,
        id: &ContentId,
        proxy_type: ProxyType,
    ) -> ArchiveResult<()> {
        let url = self.api_url(&["proxy", "generate", id.as_str(), proxy_type.as_str()])?;
        let response = self
            .http_handler
            .send_signed(Method::POST, &url, Vec::new())
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Requested {} proxy for {}", proxy_type, id);
            Ok(())
        } else {
            Err(remote_error(status, response).await)
        }
    }

    /// Resolve a playable URL for one proxy of an asset
    ///
    /// Never fails: every problem is logged and reported as `None`.
    pub async fn get_download_url(&self, id: &ContentId, proxy_type: ProxyType) -> Option<Url> {
        match self.fetch_download_url(id, proxy_type).await {
            Ok(url) => {
                tracing::debug!("Download URL for {} {} is {}", id, proxy_type, url);
                Some(url)
            }
            Err(e) => {
                tracing::error!(
                    "Could not get download URL for {} ({}): {}",
                    id,
                    proxy_type,
                    e
                );
                None
            }
        }
    }

    async fn fetch_download_url(&self, id: &ContentId, proxy_type: ProxyType) -> ArchiveResult<Url> {
        let mut url = self.api_url(&["proxy", id.as_str(), "playable"])?;
        if proxy_type != ProxyType::Unknown {
            url.query_pairs_mut()
                .append_pair(archive::PROXY_TYPE_PARAM, proxy_type.as_str());
        }

        let response = self
            .http_handler
            .send_signed(Method::GET, &url, Vec::new())
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(remote_error(status, response).await);
        }

        let body = response.bytes().await?;
        let playable: PlayableResponse = serde_json::from_slice(&body)
            .map_err(|e| ArchiveError::decode("playable response", e))?;

        // Relative URIs are resolved against the archive host
        self.base_url
            .join(&playable.uri)
            .map_err(|e| ArchiveError::InvalidUrl {
                url: playable.uri,
                error: e.to_string(),
            })
    }

    /// Download proxy content from a resolved URL to `destination`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for HTTP and file failures; see [`DownloadHandler`]
    pub async fn download_to(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        DownloadHandler::new(&self.http_handler)
            .download_file(url, destination)
            .await
    }
}

/// Turn an unexpected response into an error, keeping whatever body the server sent
async fn remote_error(status: StatusCode, response: reqwest::Response) -> ArchiveError {
    let body = response.text().await.unwrap_or_default();
    ArchiveError::Remote {
        status: status.as_u16(),
        body,
    }
}
