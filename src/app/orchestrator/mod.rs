//! Run orchestration: scan the list, feed the pool, shut everything down in order
//!
//! The orchestrator is the single producer of the pipeline. It reads the input list one
//! line at a time and, for every accepted path, asks the archive whether the asset exists
//! and which proxies it has. Missing proxies are requested for generation, existing ones
//! become work items for the download pool.
//!
//! # Shutdown order
//!
//! 1. One sentinel per worker is enqueued after the last real item
//! 2. [`WorkerPool::join`] returns once every worker has exited
//! 3. Only then does the result writer receive its own sentinel
//!
//! Per-item failures (archive errors, generation errors) are logged and counted; they never
//! stop the scan. Only an unopenable list or result log is fatal.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use proxy_fetcher::app::client::{ArchiveClient, ClientConfig};
//! use proxy_fetcher::app::orchestrator::{Orchestrator, OrchestratorConfig};
//!
//! # async fn example(client_config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ArchiveClient::new(client_config)?);
//! let config = OrchestratorConfig::new("media-bucket", "files.txt")
//!     .with_output_log("results.csv");
//!
//! let summary = Orchestrator::new(config, client).run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod stats;

use std::sync::Arc;

use indicatif::ProgressBar;
use tracing::{debug, error, info, warn};

use crate::app::client::ArchiveClient;
use crate::app::content_id::ContentId;
use crate::app::listing::{FileListReader, LineOutcome, ListEntry, ListFilter};
use crate::app::models::{required_proxies, WorkItem};
use crate::app::queue::{work_queue, WorkQueue};
use crate::app::worker::WorkerPool;
use crate::app::writer::{result_channel, ResultMessage, ResultWriter};
use crate::errors::{AppError, QueueError, QueueResult, Result};

pub use config::OrchestratorConfig;
pub use stats::{RunSummary, ScanStats};

/// Drives one complete fetch run
pub struct Orchestrator {
    config: OrchestratorConfig,
    client: Arc<ArchiveClient>,
    progress: Option<ProgressBar>,
}

impl Orchestrator {
    /// Create an orchestrator over a shared archive client
    pub fn new(config: OrchestratorConfig, client: Arc<ArchiveClient>) -> Self {
        Self {
            config,
            client,
            progress: None,
        }
    }

    /// Report scanning progress on this bar
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Run the pipeline over the whole list
    ///
    /// # Errors
    ///
    /// Configuration errors, an unreadable list file or an unopenable result log. These are
    /// all detected before any work starts.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let filter = ListFilter::new(&self.config.ignore_patterns, self.config.strip_components)?;

        let writer = ResultWriter::open(&self.config.output_log).await?;
        let mut reader = FileListReader::open(&self.config.list_path, filter).await?;

        info!(
            "Processing {} for collection {} with {} workers",
            self.config.list_path.display(),
            self.config.collection,
            self.config.worker.worker_count
        );

        let (results, records) = result_channel();
        let (queue, receiver) = work_queue(self.config.queue_capacity);
        let pool = WorkerPool::start(
            self.config.worker.clone(),
            self.client.clone(),
            receiver,
            results.clone(),
        )?;
        let writer_task = tokio::spawn(writer.run(records));

        let mut scan = ScanStats::default();
        let aborted = match self.scan(&mut reader, &queue, &mut scan).await {
            Ok(()) => false,
            Err(e) => {
                error!("Stopping scan early: {}", e);
                true
            }
        };

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }
        info!(
            "Scan finished: {} lines read, {} items enqueued",
            scan.lines_read, scan.enqueued
        );

        match queue.send_shutdown(pool.worker_count()).await {
            Ok(sent) => debug!("Sent {} shutdown signals", sent),
            Err(e) => warn!("Could not signal every worker: {}", e),
        }
        let pool_report = pool.join().await;
        drop(queue);

        // Workers are gone; the writer is the last consumer
        if results.send(ResultMessage::Shutdown).is_err() {
            warn!("Result writer exited before shutdown");
        }
        drop(results);

        let writer_report = writer_task
            .await
            .map_err(|e| AppError::generic(format!("Result writer task failed: {e}")))?;

        Ok(RunSummary {
            scan,
            pool: pool_report,
            writer: writer_report,
            aborted,
        })
    }

    /// Walk the list until its end or until no worker is left
    async fn scan(
        &self,
        reader: &mut FileListReader,
        queue: &WorkQueue,
        stats: &mut ScanStats,
    ) -> Result<()> {
        while let Some(outcome) = reader.next_line().await? {
            stats.lines_read += 1;

            match outcome {
                LineOutcome::Skipped {
                    line_number,
                    reason,
                } => {
                    debug!("Skipping line {} ({:?})", line_number, reason);
                    stats.record_skip(reason);
                }
                LineOutcome::Accepted(entry) => {
                    if let Some(bar) = &self.progress {
                        bar.set_message(entry.path.clone());
                    }
                    self.process_entry(&entry, queue, stats).await?;
                }
            }

            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
        }

        Ok(())
    }

    /// Verify, list and then either enqueue or request generation for one path
    ///
    /// Only a queue failure is returned; archive problems are logged and the entry dropped.
    async fn process_entry(
        &self,
        entry: &ListEntry,
        queue: &WorkQueue,
        stats: &mut ScanStats,
    ) -> QueueResult<()> {
        let collection = &self.config.collection;
        let id = ContentId::new(collection, &entry.path);
        stats.record_extension(&entry.path);

        match self.client.verify_exists(&id).await {
            Ok(true) => stats.verified += 1,
            Ok(false) => {
                warn!("{} does not exist in the archive ({})", entry.path, id);
                stats.missing += 1;
                return Ok(());
            }
            Err(e) => {
                error!("Could not verify {}: {}", entry.path, e);
                stats.lookup_errors += 1;
                return Ok(());
            }
        }

        let proxies = match self.client.list_proxies(&id).await {
            Ok(proxies) => proxies,
            Err(e) => {
                error!("Could not list proxies for {}: {}", entry.path, e);
                stats.lookup_errors += 1;
                return Ok(());
            }
        };

        if proxies.is_empty() {
            self.request_missing(entry, &id, stats).await;
            return Ok(());
        }

        for proxy in &proxies {
            if !proxy.is_available() {
                info!(
                    "{} proxy for {} is still being generated",
                    proxy.proxy_type, entry.path
                );
                stats.pending += 1;
                continue;
            }
            let item = WorkItem::for_proxy(collection, &entry.path, &id, proxy);
            debug!("Enqueueing {} proxy for {}", item.proxy_type, entry.path);
            queue.enqueue(item).await.map_err(|e| {
                if matches!(e, QueueError::NoConsumers) {
                    error!("All workers have exited, cannot enqueue {}", entry.path);
                }
                e
            })?;
            stats.enqueued += 1;
        }

        Ok(())
    }

    /// Request every proxy this kind of file needs; failures do not block siblings
    async fn request_missing(&self, entry: &ListEntry, id: &ContentId, stats: &mut ScanStats) {
        let required = required_proxies(&entry.path);
        if required.is_empty() {
            info!(
                "{} has no proxies and no proxy types apply to it",
                entry.path
            );
            return;
        }

        info!("{} has no proxies, requesting generation", entry.path);
        for proxy_type in required {
            match self.client.request_generation(id, *proxy_type).await {
                Ok(()) => stats.generation_requested += 1,
                Err(e) => {
                    error!(
                        "Could not request {} proxy for {}: {}",
                        proxy_type, entry.path, e
                    );
                    stats.generation_failed += 1;
                }
            }
        }
    }
}
