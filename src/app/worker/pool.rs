//! Worker pool management and coordination
//!
//! The pool spawns a fixed number of workers on a shared queue and result channel.
//! [`WorkerPool::join`] is the shutdown barrier: it returns only once every worker task
//! has finished, however it finished.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::WorkerConfig;
use super::core::{DownloadWorker, WorkerExit, WorkerReport};
use crate::app::client::ArchiveClient;
use crate::app::queue::WorkReceiver;
use crate::app::writer::ResultSender;
use crate::errors::ConfigResult;

/// Aggregate of all worker reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Workers that stopped on their sentinel
    pub clean: usize,
    /// Workers that gave up waiting for work
    pub idle: usize,
    /// Workers that lost the queue or the result channel
    pub disconnected: usize,
    /// Worker tasks that panicked or were cancelled outside item processing
    pub panicked: usize,
    pub processed: u64,
    pub failures: u64,
    pub skipped_existing: u64,
}

impl PoolReport {
    fn record(&mut self, report: &WorkerReport) {
        match report.exit {
            WorkerExit::Shutdown => self.clean += 1,
            WorkerExit::IdleTimeout => self.idle += 1,
            WorkerExit::Disconnected => self.disconnected += 1,
        }
        self.processed += report.processed;
        self.failures += report.failures;
        self.skipped_existing += report.skipped_existing;
    }

    /// Every worker exited through its sentinel
    pub fn all_clean(&self) -> bool {
        self.idle == 0 && self.disconnected == 0 && self.panicked == 0
    }
}

/// Pool of running download workers
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Validate the configuration and spawn `worker_count` workers
    ///
    /// Each worker is registered as a queue consumer before this returns, so the producer
    /// sees the full consumer count immediately.
    pub fn start(
        config: WorkerConfig,
        client: Arc<ArchiveClient>,
        queue: WorkReceiver,
        results: ResultSender,
    ) -> ConfigResult<Self> {
        config.validate()?;
        info!("Starting {} workers", config.worker_count);

        let mut handles = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = DownloadWorker::new(worker_id as u32, config.clone(), client.clone());
            let queue = queue.clone();
            let results = results.clone();
            let guard = queue.register();

            handles.push(tokio::spawn(async move {
                let _guard = guard;
                worker.run(queue, results).await
            }));
        }

        Ok(Self { handles })
    }

    /// Get number of spawned workers
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit
    pub async fn join(self) -> PoolReport {
        let mut report = PoolReport::default();

        for handle in self.handles {
            match handle.await {
                Ok(worker) => report.record(&worker),
                Err(e) => {
                    warn!("Worker task failed: {}", e);
                    report.panicked += 1;
                }
            }
        }

        if report.idle > 0 {
            warn!("{} workers ran out of work before shutdown", report.idle);
        }
        if report.disconnected > 0 {
            warn!("{} workers were disconnected", report.disconnected);
        }

        info!(
            "Worker pool finished: {} items processed, {} failed",
            report.processed, report.failures
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::tempdir;
    use url::Url;

    use crate::app::client::ClientConfig;
    use crate::app::content_id::ContentId;
    use crate::app::models::{ProxyType, WorkItem};
    use crate::app::queue::work_queue;
    use crate::app::writer::{result_channel, ResultMessage};

    fn client() -> Arc<ArchiveClient> {
        // Port 9 (discard) on localhost is expected to refuse connections
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let config = ClientConfig::new(base, "secret").with_rate_limit(1000);
        Arc::new(ArchiveClient::new(config).unwrap())
    }

    fn item(n: usize) -> WorkItem {
        let path = format!("d/f{n}.mov");
        WorkItem {
            source_bucket: "b".to_string(),
            proxy_archive_id: ContentId::new("b", &path),
            source_path: path,
            proxy_type: ProxyType::Video,
            display_name: format!("f{n}.mp4"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (_queue, receiver) = work_queue(1);
        let (tx, _rx) = result_channel();
        let result = WorkerPool::start(
            WorkerConfig::default().with_worker_count(0),
            client(),
            receiver,
            tx,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_join_waits_for_all_workers() {
        let dir = tempdir().unwrap();
        // Items already on disk, so workers never touch the network
        for n in 0..6 {
            let path = dir.path().join(format!("d/f{n}.mov.mp4"));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"x").unwrap();
        }

        let (queue, receiver) = work_queue(4);
        let (tx, mut rx) = result_channel();
        let config = WorkerConfig::default()
            .with_worker_count(3)
            .with_download_dir(dir.path())
            .with_dequeue_timeout(Duration::from_secs(5));

        let pool = WorkerPool::start(config, client(), receiver, tx).unwrap();
        assert_eq!(pool.worker_count(), 3);
        assert_eq!(queue.consumer_count(), 3);

        for n in 0..6 {
            queue.enqueue(item(n)).await.unwrap();
        }
        assert_eq!(queue.send_shutdown(3).await.unwrap(), 3);

        let report = pool.join().await;
        assert_eq!(report.clean, 3);
        assert!(report.all_clean());
        assert_eq!(report.processed, 6);
        assert_eq!(report.skipped_existing, 6);
        assert_eq!(queue.consumer_count(), 0);

        let mut successes = 0;
        while let Ok(ResultMessage::Record(record)) = rx.try_recv() {
            assert!(record.is_success());
            successes += 1;
        }
        assert_eq!(successes, 6);
    }
}
