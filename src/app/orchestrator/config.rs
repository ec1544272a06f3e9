//! Configuration for a fetch run
//!
//! Everything the orchestrator needs besides the archive client: where the list is,
//! how to filter it, where results go, and how the worker pool is shaped.

use std::path::PathBuf;

use crate::app::worker::WorkerConfig;
use crate::constants::{files, listing, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for one orchestrated run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Collection (bucket) every listed path belongs to
    pub collection: String,
    /// Newline-delimited list of source paths
    pub list_path: PathBuf,
    /// Append-only CSV result log
    pub output_log: PathBuf,
    /// Regexes matched against file names to skip
    pub ignore_patterns: Vec<String>,
    /// Leading directory components dropped before computing identifiers
    pub strip_components: usize,
    /// Bound of the work queue
    pub queue_capacity: usize,
    /// Worker pool configuration
    pub worker: WorkerConfig,
}

impl OrchestratorConfig {
    /// Create a configuration with defaults for everything but the collection and list
    pub fn new(collection: impl Into<String>, list_path: impl Into<PathBuf>) -> Self {
        Self {
            collection: collection.into(),
            list_path: list_path.into(),
            output_log: PathBuf::from(files::DEFAULT_OUTPUT_LOG),
            ignore_patterns: listing::DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            strip_components: 0,
            queue_capacity: workers::DEFAULT_QUEUE_CAPACITY,
            worker: WorkerConfig::default(),
        }
    }

    pub fn with_output_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_log = path.into();
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Replace the worker pool configuration
    pub fn with_worker_config(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::missing("archive.collection"));
        }

        if self.list_path.as_os_str().is_empty() {
            return Err(ConfigError::missing("list"));
        }

        if self.output_log.as_os_str().is_empty() {
            return Err(ConfigError::missing("pipeline.output_log"));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "pipeline.queue_capacity",
                0,
                "Queue capacity must be greater than zero",
            ));
        }

        self.worker.validate()
    }
}
