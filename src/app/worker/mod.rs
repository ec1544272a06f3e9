//! Download worker system for concurrent proxy retrieval
//!
//! A fixed pool of workers pulls [`WorkItem`](crate::app::models::WorkItem)s from the
//! work queue, resolves a deterministic local destination, downloads the proxy unless it
//! is already on disk, and sends one result record per item to the result writer.
//!
//! # Module Organization
//!
//! - [`config`] - Worker configuration with validation
//! - [`destination`] - Local path derivation and bounded name probing
//! - [`core`] - Individual worker implementation with download logic
//! - [`pool`] - Worker pool startup and the shutdown barrier
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use proxy_fetcher::app::client::{ArchiveClient, ClientConfig};
//! use proxy_fetcher::app::queue::work_queue;
//! use proxy_fetcher::app::worker::{WorkerConfig, WorkerPool};
//! use proxy_fetcher::app::writer::result_channel;
//!
//! # async fn example(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ArchiveClient::new(config)?);
//! let (queue, receiver) = work_queue(100);
//! let (results, _records) = result_channel();
//!
//! let pool = WorkerPool::start(WorkerConfig::default(), client, receiver, results)?;
//! // ... enqueue work ...
//! queue.send_shutdown(pool.worker_count()).await?;
//! let report = pool.join().await;
//! println!("{} items processed", report.processed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod destination;
pub mod pool;

pub use config::WorkerConfig;
pub use core::{DownloadWorker, WorkerExit, WorkerReport};
pub use destination::{destination_for, find_available_path};
pub use pool::{PoolReport, WorkerPool};
