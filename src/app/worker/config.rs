//! Worker configuration management
//!
//! Configuration and validation for the download worker pool.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{files, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for download workers
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent workers to spawn
    pub worker_count: usize,
    /// Root directory proxies are downloaded into
    pub download_dir: PathBuf,
    /// How long an idle worker waits for work before exiting
    pub dequeue_timeout: Duration,
    /// Upper bound on resolving and downloading one item
    pub item_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            download_dir: PathBuf::from(files::DEFAULT_DOWNLOAD_DIR),
            dequeue_timeout: workers::DEFAULT_DEQUEUE_TIMEOUT,
            item_timeout: workers::DEFAULT_ITEM_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker_count == 0 {
            return Err(ConfigError::invalid(
                "pipeline.worker_count",
                self.worker_count,
                "Worker count cannot be zero",
            ));
        }

        if self.worker_count > workers::MAX_WORKER_COUNT {
            return Err(ConfigError::invalid(
                "pipeline.worker_count",
                self.worker_count,
                format!("Worker count exceeds maximum ({})", workers::MAX_WORKER_COUNT),
            ));
        }

        if self.dequeue_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "pipeline.dequeue_timeout_secs",
                0,
                "Dequeue timeout must be greater than zero",
            ));
        }

        if self.item_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "pipeline.item_timeout_secs",
                0,
                "Item timeout must be greater than zero",
            ));
        }

        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::missing("pipeline.download_dir"));
        }

        Ok(())
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }
}
