//! Core download worker implementation
//!
//! Each worker loops `Idle -> Dequeue -> {Terminate | Process} -> Idle`. Processing one
//! item always ends in exactly one [`ResultRecord`], whatever happens inside it: an
//! existing file, a missing URL, a failed stream, a timeout or even a panic.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::config::WorkerConfig;
use super::destination::destination_for;
use crate::app::client::download::{partial_path, remove_partial};
use crate::app::client::ArchiveClient;
use crate::app::models::{ResultRecord, WorkItem};
use crate::app::queue::{Dequeued, WorkReceiver};
use crate::app::writer::{ResultMessage, ResultSender};
use crate::errors::{DownloadError, DownloadResult};

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Received its shutdown sentinel
    Shutdown,
    /// Waited a full dequeue timeout without receiving anything
    IdleTimeout,
    /// The queue or the result channel went away
    Disconnected,
}

/// What one worker did before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: u32,
    pub exit: WorkerExit,
    pub processed: u64,
    pub failures: u64,
    pub skipped_existing: u64,
}

/// How an item was completed, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Downloaded,
    AlreadyPresent,
    Failed,
}

/// Individual download worker
#[derive(Debug)]
pub struct DownloadWorker {
    id: u32,
    config: WorkerConfig,
    client: Arc<ArchiveClient>,
}

impl DownloadWorker {
    /// Create a new download worker
    pub fn new(id: u32, config: WorkerConfig, client: Arc<ArchiveClient>) -> Self {
        Self { id, config, client }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Run until a sentinel, an idle timeout or a disconnect
    pub async fn run(self, queue: WorkReceiver, results: ResultSender) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            exit: WorkerExit::Shutdown,
            processed: 0,
            failures: 0,
            skipped_existing: 0,
        };

        debug!("Worker {} ready for work", self.id);

        loop {
            let item = match queue.dequeue(self.config.dequeue_timeout).await {
                Dequeued::Work(item) => item,
                Dequeued::Shutdown => {
                    info!("Worker {} terminating on request", self.id);
                    report.exit = WorkerExit::Shutdown;
                    break;
                }
                Dequeued::TimedOut => {
                    error!(
                        "Worker {} ran out of work after waiting {:?}",
                        self.id, self.config.dequeue_timeout
                    );
                    report.exit = WorkerExit::IdleTimeout;
                    break;
                }
                Dequeued::Closed => {
                    warn!("Worker {} found the work queue closed", self.id);
                    report.exit = WorkerExit::Disconnected;
                    break;
                }
            };

            let (record, outcome) = self.process(&item).await;
            report.processed += 1;
            match outcome {
                Outcome::Failed => report.failures += 1,
                Outcome::AlreadyPresent => report.skipped_existing += 1,
                Outcome::Downloaded => {}
            }

            if results.send(ResultMessage::Record(record)).is_err() {
                error!(
                    "Worker {} cannot deliver results, result writer is gone",
                    self.id
                );
                report.exit = WorkerExit::Disconnected;
                break;
            }
        }

        debug!(
            "Worker {} stopped ({:?}) after {} items",
            self.id, report.exit, report.processed
        );
        report
    }

    /// Process one item into exactly one result record
    async fn process(&self, item: &WorkItem) -> (ResultRecord, Outcome) {
        let started = Instant::now();
        let guarded = AssertUnwindSafe(tokio::time::timeout(
            self.config.item_timeout,
            self.process_item(item),
        ))
        .catch_unwind()
        .await;

        let result = match guarded {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => {
                self.discard_partial(item).await;
                Err(DownloadError::Timeout {
                    seconds: self.config.item_timeout.as_secs(),
                })
            }
            Err(panic) => {
                self.discard_partial(item).await;
                Err(DownloadError::Panicked {
                    message: panic_message(panic.as_ref()),
                })
            }
        };

        match result {
            Ok((path, outcome)) => {
                debug!(
                    "Worker {} finished {} in {:?}",
                    self.id,
                    item.source_path,
                    started.elapsed()
                );
                (
                    ResultRecord::success(item, path.display().to_string()),
                    outcome,
                )
            }
            Err(e) => {
                error!(
                    "Worker {} could not process {} ({}): {}",
                    self.id, item.source_path, item.proxy_type, e
                );
                (ResultRecord::failure(item, &e), Outcome::Failed)
            }
        }
    }

    /// Remove the in-flight file of a download whose future was dropped
    async fn discard_partial(&self, item: &WorkItem) {
        if let Ok(destination) = destination_for(&self.config.download_dir, item) {
            remove_partial(&partial_path(&destination)).await;
        }
    }

    async fn process_item(&self, item: &WorkItem) -> DownloadResult<(PathBuf, Outcome)> {
        let destination = destination_for(&self.config.download_dir, item)?;

        if path_exists(&destination).await {
            info!("Path {} already exists", destination.display());
            return Ok((destination, Outcome::AlreadyPresent));
        }

        debug!(
            "Path {} does not exist, downloading {} proxy",
            destination.display(),
            item.proxy_type
        );

        let url = self
            .client
            .get_download_url(&item.proxy_archive_id, item.proxy_type)
            .await
            .ok_or_else(|| DownloadError::NoDownloadUrl {
                content_id: item.proxy_archive_id.to_string(),
            })?;

        self.client.download_to(&url, &destination).await?;
        Ok((destination, Outcome::Downloaded))
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::tempdir;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use url::Url;

    use crate::app::client::ClientConfig;
    use crate::app::content_id::ContentId;
    use crate::app::models::ProxyType;
    use crate::app::queue::work_queue;
    use crate::app::writer::result_channel;

    /// Client pointed at a port nothing listens on
    async fn unreachable_client() -> Arc<ArchiveClient> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let config = ClientConfig::new(base, "secret").with_rate_limit(1000);
        Arc::new(ArchiveClient::new(config).unwrap())
    }

    fn item(path: &str) -> WorkItem {
        WorkItem {
            source_bucket: "bucket".to_string(),
            source_path: path.to_string(),
            proxy_type: ProxyType::Video,
            proxy_archive_id: ContentId::new("bucket", path),
            display_name: "clip.mp4".to_string(),
        }
    }

    fn config(dir: &Path) -> WorkerConfig {
        WorkerConfig::default()
            .with_download_dir(dir)
            .with_dequeue_timeout(Duration::from_millis(200))
            .with_item_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_existing_file_is_success_without_fetch() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("a/clip.mov.mp4");
        tokio::fs::create_dir_all(existing.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&existing, b"done").await.unwrap();

        let worker = DownloadWorker::new(0, config(dir.path()), unreachable_client().await);
        let (record, outcome) = worker.process(&item("a/clip.mov")).await;

        assert_eq!(outcome, Outcome::AlreadyPresent);
        assert!(record.is_success());
        assert_eq!(record.proxy_path, existing.display().to_string());
    }

    #[tokio::test]
    async fn test_unresolvable_url_is_failure_record() {
        let dir = tempdir().unwrap();
        let worker = DownloadWorker::new(0, config(dir.path()), unreachable_client().await);
        let (record, outcome) = worker.process(&item("a/clip.mov")).await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(record.proxy_path.is_empty());
        assert!(record.error.contains("No download URL"));
        assert_eq!(record.media_path, "a/clip.mov");
    }

    #[tokio::test]
    async fn test_worker_keeps_going_after_failures_and_stops_on_sentinel() {
        let dir = tempdir().unwrap();
        let (queue, receiver) = work_queue(10);
        let guard = receiver.register();
        let (tx, mut rx) = result_channel();

        for n in 0..3 {
            queue.enqueue(item(&format!("dir/clip{n}.mov"))).await.unwrap();
        }
        queue.send_shutdown(1).await.unwrap();

        let worker = DownloadWorker::new(7, config(dir.path()), unreachable_client().await);
        let report = worker.run(receiver, tx).await;
        drop(guard);

        assert_eq!(report.exit, WorkerExit::Shutdown);
        assert_eq!(report.processed, 3);
        assert_eq!(report.failures, 3);

        let mut records = 0;
        while let Ok(message) = rx.try_recv() {
            assert!(matches!(message, ResultMessage::Record(_)));
            records += 1;
        }
        assert_eq!(records, 3);
    }

    /// Archive that resolves every proxy and then stalls the media body after a few bytes
    async fn stalling_client() -> Arc<ArchiveClient> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut reader = BufReader::new(&mut socket);
                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).await.unwrap();
                    loop {
                        let mut header = String::new();
                        reader.read_line(&mut header).await.unwrap();
                        if header.trim().is_empty() {
                            break;
                        }
                    }

                    if request_line.contains("/media/") {
                        socket
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                            .await
                            .unwrap();
                        socket.flush().await.unwrap();
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    } else {
                        let body = format!(r#"{{"uri":"http://{addr}/media/clip"}}"#);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        socket.write_all(response.as_bytes()).await.unwrap();
                    }
                });
            }
        });

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let config = ClientConfig::new(base, "secret").with_rate_limit(1000);
        Arc::new(ArchiveClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_item_timeout_removes_partial_file() {
        let dir = tempdir().unwrap();
        let config = config(dir.path()).with_item_timeout(Duration::from_millis(500));
        let worker = DownloadWorker::new(0, config, stalling_client().await);

        let work = item("a/clip.mov");
        let (record, outcome) = worker.process(&work).await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(!record.is_success());
        let destination = destination_for(dir.path(), &work).unwrap();
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_idle_worker_times_out() {
        let dir = tempdir().unwrap();
        let (_queue, receiver) = work_queue(1);
        let (tx, _rx) = result_channel();

        let worker = DownloadWorker::new(1, config(dir.path()), unreachable_client().await);
        let report = worker.run(receiver, tx).await;

        assert_eq!(report.exit, WorkerExit::IdleTimeout);
        assert_eq!(report.processed, 0);
    }
}
