//! Core application logic for Proxy Fetcher
//!
//! This module contains the main application components: content identifiers and data
//! models, the input list reader, the signed archive client, the work queue, the download
//! worker pool, the result writer and the orchestrator that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use proxy_fetcher::app::{ArchiveClient, ClientConfig, ContentId};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("https://archive.example.com/")?;
//! let client = ArchiveClient::new(ClientConfig::new(base, "secret"))?;
//!
//! let id = ContentId::new("media-bucket", "shows/ep1/clip.mov");
//! if client.verify_exists(&id).await? {
//!     for proxy in client.list_proxies(&id).await? {
//!         println!("{} at {:?}", proxy.proxy_type, proxy.bucket_path);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod content_id;
pub mod listing;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod worker;
pub mod writer;

// Re-export main public API
pub use client::{ArchiveClient, ClientConfig, RequestSigner, SignatureScheme};
pub use content_id::ContentId;
pub use listing::{FileListReader, ListEntry, ListFilter};
pub use models::{MediaClass, ProxyDescriptor, ProxyType, ResultRecord, WorkItem};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunSummary};
pub use queue::{work_queue, WorkQueue, WorkReceiver};
pub use worker::{WorkerConfig, WorkerPool};
pub use writer::ResultWriter;
