//! Proxy download with streaming and atomic writes
//!
//! The body is streamed into `<destination>.partial`, flushed, and renamed into place.
//! Any error removes the partial file, so a file at the final path is always a completed
//! download. A download future dropped mid-stream cannot clean up after itself; callers
//! that cancel one (the worker's per-item timeout) remove the partial file with
//! [`remove_partial`].

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Download `url` to `destination`, returning the number of bytes written
    ///
    /// Parent directories are created as needed. An existing file at `destination` is
    /// replaced; callers that want to keep existing files check before calling.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails, the server answers with a non-success
    /// status, or any file operation fails. The partial file is removed before the error
    /// is returned.
    pub async fn download_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = partial_path(destination);

        match self.download_attempt(url, &temp_path).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&temp_path, destination).await {
                    tracing::error!(
                        "Could not move {} into place: {}",
                        temp_path.display(),
                        e
                    );
                    remove_partial(&temp_path).await;
                    return Err(DownloadError::AtomicOperationFailed {
                        temp_path,
                        final_path: destination.to_path_buf(),
                    });
                }
                tracing::info!(
                    "Downloaded {} bytes to {}",
                    bytes,
                    destination.display()
                );
                Ok(bytes)
            }
            Err(e) => {
                remove_partial(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn download_attempt(&self, url: &Url, temp_path: &Path) -> DownloadResult<u64> {
        let response = self.http_handler.get_unsigned(url).await?;

        if !response.status().is_success() {
            return Err(DownloadError::ServerError {
                status: response.status().as_u16(),
            });
        }

        let mut file = File::create(temp_path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            // Empty keep-alive chunks carry nothing to write
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(written)
    }
}

/// In-flight path for a download destination
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(files::PARTIAL_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Delete an in-flight file; a missing file is not an error
pub async fn remove_partial(temp_path: &Path) {
    match tokio::fs::remove_file(temp_path).await {
        Ok(()) => tracing::debug!("Removed partial file {}", temp_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Could not remove partial file {}: {}",
            temp_path.display(),
            e
        ),
    }
}
