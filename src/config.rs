//! Configuration management for Proxy Fetcher
//!
//! Configuration comes from several sources, later ones overriding earlier ones:
//! built-in defaults, a TOML file, environment variables (including a `.env` file loaded
//! at startup) and finally command line flags, which the CLI applies on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::client::{ClientConfig, SignatureScheme};
use crate::app::orchestrator::OrchestratorConfig;
use crate::app::worker::WorkerConfig;
use crate::constants::{env, files, http, limits, listing, workers};
use crate::errors::{ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Archive service location and credentials
    pub archive: ArchiveConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Scan and download pipeline settings
    pub pipeline: PipelineConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Archive service location and credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfigToml {
    /// Hostname, optionally with a port
    pub hostname: Option<String>,
    /// `https` unless talking to a local test service
    pub scheme: String,
    /// Collection (bucket) the listed files belong to
    pub collection: Option<String>,
    /// Shared HMAC secret
    pub secret: Option<String>,
    /// Signing scheme the service expects
    pub signature_scheme: SignatureScheme,
}

impl Default for ArchiveConfigToml {
    fn default() -> Self {
        Self {
            hostname: None,
            scheme: "https".to_string(),
            collection: None,
            secret: None,
            signature_scheme: SignatureScheme::default(),
        }
    }
}

impl std::fmt::Debug for ArchiveConfigToml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveConfigToml")
            .field("hostname", &self.hostname)
            .field("scheme", &self.scheme)
            .field("collection", &self.collection)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("signature_scheme", &self.signature_scheme)
            .finish()
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Whole-request timeout in seconds (None = no timeout)
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Automatic retries per API call
    pub max_retries: u32,
    /// User agent header
    pub user_agent: String,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::DEFAULT_MAX_RETRIES,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

/// TOML-friendly pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfigToml {
    /// Number of concurrent download workers
    pub worker_count: usize,
    /// Bound of the work queue
    pub queue_capacity: usize,
    /// Idle time after which a worker gives up, in seconds
    pub dequeue_timeout_secs: u64,
    /// Upper bound on one item's resolve and download, in seconds
    pub item_timeout_secs: u64,
    /// Root directory for downloaded proxies
    pub download_dir: PathBuf,
    /// Result log path
    pub output_log: PathBuf,
    /// File name patterns that are never processed
    pub ignore_patterns: Vec<String>,
    /// Leading directory components dropped from listed paths
    pub strip_components: usize,
    /// Show a scanning spinner on interactive terminals
    pub show_progress: bool,
}

impl Default for PipelineConfigToml {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            queue_capacity: workers::DEFAULT_QUEUE_CAPACITY,
            dequeue_timeout_secs: workers::DEFAULT_DEQUEUE_TIMEOUT.as_secs(),
            item_timeout_secs: workers::DEFAULT_ITEM_TIMEOUT.as_secs(),
            download_dir: PathBuf::from(files::DEFAULT_DOWNLOAD_DIR),
            output_log: PathBuf::from(files::DEFAULT_OUTPUT_LOG),
            ignore_patterns: listing::DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            strip_components: 0,
            show_progress: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// CLI arguments are applied by the caller afterwards.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path }.into());
            }
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override archive settings from environment variables
    ///
    /// Takes a lookup function so tests do not have to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(hostname) = non_empty(env::HOSTNAME) {
            self.archive.hostname = Some(hostname);
        }
        if let Some(secret) = non_empty(env::SECRET) {
            self.archive.secret = Some(secret);
        }
        if let Some(collection) = non_empty(env::COLLECTION) {
            self.archive.collection = Some(collection);
        }
    }

    /// Check that everything a fetch run needs is present
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingField` for a missing hostname, secret or collection
    pub fn validate(&self) -> ConfigResult<()> {
        self.hostname()?;
        self.secret()?;
        self.collection()?;

        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::invalid(
                "client.rate_limit_rps",
                0,
                "Rate limit must be greater than zero",
            ));
        }
        if self.client.max_retries > limits::MAX_RETRIES {
            return Err(ConfigError::invalid(
                "client.max_retries",
                self.client.max_retries,
                format!("At most {} retries are allowed", limits::MAX_RETRIES),
            ));
        }

        self.worker_config().validate()
    }

    pub fn hostname(&self) -> ConfigResult<&str> {
        required(&self.archive.hostname, "archive.hostname")
    }

    pub fn secret(&self) -> ConfigResult<&str> {
        required(&self.archive.secret, "archive.secret")
    }

    pub fn collection(&self) -> ConfigResult<&str> {
        required(&self.archive.collection, "archive.collection")
    }

    /// Build the runtime client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let base_url = ClientConfig::base_url_for(&self.archive.scheme, self.hostname()?)?;

        let mut config = ClientConfig::new(base_url, self.secret()?)
            .with_scheme(self.archive.signature_scheme)
            .with_request_timeout(self.client.request_timeout_secs.map(Duration::from_secs))
            .with_rate_limit(self.client.rate_limit_rps)
            .with_max_retries(self.client.max_retries);
        config.connect_timeout = Duration::from_secs(self.client.connect_timeout_secs);
        config.user_agent = self.client.user_agent.clone();

        Ok(config)
    }

    /// Build the runtime worker configuration
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_worker_count(self.pipeline.worker_count)
            .with_download_dir(self.pipeline.download_dir.clone())
            .with_dequeue_timeout(Duration::from_secs(self.pipeline.dequeue_timeout_secs))
            .with_item_timeout(Duration::from_secs(self.pipeline.item_timeout_secs))
    }

    /// Build the runtime orchestrator configuration for one list file
    pub fn orchestrator_config(&self, list_path: &Path) -> ConfigResult<OrchestratorConfig> {
        Ok(OrchestratorConfig::new(self.collection()?, list_path)
            .with_output_log(self.pipeline.output_log.clone())
            .with_ignore_patterns(self.pipeline.ignore_patterns.clone())
            .with_strip_components(self.pipeline.strip_components)
            .with_queue_capacity(self.pipeline.queue_capacity)
            .with_worker_config(self.worker_config()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> ConfigResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::missing(field))
}
