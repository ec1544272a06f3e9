//! Work queue between the list scanner and the download workers
//!
//! A bounded FIFO of [`QueueMessage`]s. Real work and the shutdown sentinel are distinct
//! variants, and [`Dequeued`] keeps "nothing arrived in time" apart from "shut down now".
//!
//! The producer side ([`WorkQueue`]) knows how many consumers are still alive, so a
//! producer blocked on a full queue gives up with [`QueueError::NoConsumers`] once every
//! worker has exited instead of waiting forever.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use proxy_fetcher::app::queue::{work_queue, Dequeued};
//!
//! # async fn example(item: proxy_fetcher::app::models::WorkItem) -> Result<(), Box<dyn std::error::Error>> {
//! let (queue, receiver) = work_queue(100);
//! let _guard = receiver.register();
//!
//! queue.enqueue(item).await?;
//! queue.send_shutdown(1).await?;
//!
//! while let Dequeued::Work(item) = receiver.dequeue(Duration::from_secs(5)).await {
//!     println!("processing {}", item.source_path);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::app::models::WorkItem;
use crate::constants::workers;
use crate::errors::{QueueError, QueueResult};

#[cfg(test)]
mod tests;

/// Message carried by the work queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
    Work(WorkItem),
    /// One per worker, after the last real item
    Shutdown,
}

/// Result of waiting on the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    Work(WorkItem),
    Shutdown,
    /// Nothing arrived within the timeout
    TimedOut,
    /// Every producer is gone and the queue is drained
    Closed,
}

/// Create a connected producer/consumer pair
pub fn work_queue(capacity: usize) -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let consumers = Arc::new(AtomicUsize::new(0));

    let queue = WorkQueue {
        tx,
        consumers: consumers.clone(),
        enqueued: AtomicU64::new(0),
        poll_interval: workers::ENQUEUE_POLL_INTERVAL,
    };
    let receiver = WorkReceiver {
        rx: Arc::new(Mutex::new(rx)),
        consumers,
    };
    (queue, receiver)
}

/// Producer side of the work queue
#[derive(Debug)]
pub struct WorkQueue {
    tx: mpsc::Sender<QueueMessage>,
    consumers: Arc<AtomicUsize>,
    enqueued: AtomicU64,
    poll_interval: Duration,
}

impl WorkQueue {
    /// Override how often a blocked send re-checks for live consumers
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Add a work item, waiting while the queue is full
    ///
    /// # Errors
    ///
    /// `QueueError::NoConsumers` once no worker is left to take the item,
    /// `QueueError::Closed` if the receiving side was dropped
    pub async fn enqueue(&self, item: WorkItem) -> QueueResult<()> {
        self.send(QueueMessage::Work(item)).await?;
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send `count` shutdown sentinels, returning how many were delivered
    ///
    /// Stops early, without error, if every consumer has already exited.
    pub async fn send_shutdown(&self, count: usize) -> QueueResult<usize> {
        let mut sent = 0;
        for _ in 0..count {
            match self.send(QueueMessage::Shutdown).await {
                Ok(()) => sent += 1,
                Err(QueueError::NoConsumers) => {
                    tracing::debug!("No consumers left, {} of {} sentinels sent", sent, count);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sent)
    }

    async fn send(&self, message: QueueMessage) -> QueueResult<()> {
        let mut message = message;
        loop {
            if self.consumer_count() == 0 {
                return Err(QueueError::NoConsumers);
            }
            match self.tx.send_timeout(message, self.poll_interval).await {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendTimeoutError::Timeout(returned)) => {
                    tracing::trace!("Work queue full, waiting for workers");
                    message = returned;
                }
                Err(mpsc::error::SendTimeoutError::Closed(_)) => return Err(QueueError::Closed),
            }
        }
    }

    /// Workers currently registered on the receiving side
    pub fn consumer_count(&self) -> usize {
        self.consumers.load(Ordering::SeqCst)
    }

    /// Work items accepted so far (sentinels excluded)
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Messages currently waiting in the queue
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer side of the work queue, shared by all workers
#[derive(Debug, Clone)]
pub struct WorkReceiver {
    rx: Arc<Mutex<mpsc::Receiver<QueueMessage>>>,
    consumers: Arc<AtomicUsize>,
}

impl WorkReceiver {
    /// Count a worker as live until the returned guard is dropped
    pub fn register(&self) -> ConsumerGuard {
        self.consumers.fetch_add(1, Ordering::SeqCst);
        ConsumerGuard {
            consumers: self.consumers.clone(),
        }
    }

    /// Wait up to `timeout` for the next message
    pub async fn dequeue(&self, timeout: Duration) -> Dequeued {
        let next = tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await;

        match next {
            Ok(Some(QueueMessage::Work(item))) => Dequeued::Work(item),
            Ok(Some(QueueMessage::Shutdown)) => Dequeued::Shutdown,
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::TimedOut,
        }
    }
}

/// Registration of one live consumer
#[derive(Debug)]
pub struct ConsumerGuard {
    consumers: Arc<AtomicUsize>,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        self.consumers.fetch_sub(1, Ordering::SeqCst);
    }
}
