//! Prelude module for Proxy Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use proxy_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use proxy_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let client = Arc::new(ArchiveClient::new(config.client_config()?)?);
//!     let run = config.orchestrator_config(Path::new("files.txt"))?;
//!
//!     let summary = Orchestrator::new(run, client).run().await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Archive access
    ArchiveClient,
    ClientConfig,
    ContentId,
    // Orchestration
    Orchestrator,
    OrchestratorConfig,
    // Data types
    ProxyDescriptor,
    ProxyType,
    ResultRecord,
    RunSummary,
    SignatureScheme,
    WorkItem,
    WorkerConfig,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{
    DEFAULT_RATE_LIMIT_RPS, DEFAULT_WORKER_COUNT, ENV_HOSTNAME, ENV_SECRET, USER_AGENT,
};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
