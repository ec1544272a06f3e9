//! Unit tests for the work queue
//!
//! Covers FIFO delivery, sentinel handling, timeouts and the no-consumer guard.

use std::time::Duration;

use super::*;
use crate::app::content_id::ContentId;
use crate::app::models::ProxyType;

fn item(n: usize) -> WorkItem {
    let path = format!("dir/clip{n}.mov");
    WorkItem {
        source_bucket: "bucket".to_string(),
        proxy_archive_id: ContentId::new("bucket", &path),
        source_path: path,
        proxy_type: ProxyType::Video,
        display_name: format!("clip{n}.mp4"),
    }
}

/// Test items come out in the order they went in
#[tokio::test]
async fn test_fifo_order() {
    let (queue, receiver) = work_queue(10);
    let _guard = receiver.register();

    for n in 0..3 {
        queue.enqueue(item(n)).await.unwrap();
    }
    assert_eq!(queue.enqueued(), 3);
    assert_eq!(queue.len(), 3);

    for n in 0..3 {
        assert_eq!(
            receiver.dequeue(Duration::from_secs(1)).await,
            Dequeued::Work(item(n))
        );
    }
    assert!(queue.is_empty());
}

/// Test sentinels are delivered after real work and are distinct from timeouts
#[tokio::test]
async fn test_sentinel_after_work() {
    let (queue, receiver) = work_queue(10);
    let _a = receiver.register();
    let _b = receiver.register();

    queue.enqueue(item(1)).await.unwrap();
    assert_eq!(queue.send_shutdown(2).await.unwrap(), 2);

    assert!(matches!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Work(_)
    ));
    assert_eq!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Shutdown
    );
    assert_eq!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Shutdown
    );
    assert_eq!(
        receiver.dequeue(Duration::from_millis(20)).await,
        Dequeued::TimedOut
    );
}

/// Test an empty queue times out rather than blocking
#[tokio::test]
async fn test_dequeue_timeout() {
    let (_queue, receiver) = work_queue(1);
    let _guard = receiver.register();
    let started = std::time::Instant::now();
    assert_eq!(
        receiver.dequeue(Duration::from_millis(50)).await,
        Dequeued::TimedOut
    );
    assert!(started.elapsed() >= Duration::from_millis(50));
}

/// Test dropping the producer closes the queue once drained
#[tokio::test]
async fn test_closed_after_producer_dropped() {
    let (queue, receiver) = work_queue(4);
    let _guard = receiver.register();
    queue.enqueue(item(1)).await.unwrap();
    drop(queue);

    assert!(matches!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Work(_)
    ));
    assert_eq!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Closed
    );
}

/// Test enqueue fails fast when no worker is registered
#[tokio::test]
async fn test_enqueue_without_consumers() {
    let (queue, receiver) = work_queue(4);
    let result = queue.enqueue(item(1)).await;
    assert!(matches!(result, Err(QueueError::NoConsumers)));

    let guard = receiver.register();
    assert_eq!(queue.consumer_count(), 1);
    drop(guard);
    assert_eq!(queue.consumer_count(), 0);
}

/// Test a producer blocked on a full queue is released when the last consumer exits
#[tokio::test]
async fn test_blocked_enqueue_released_when_consumers_exit() {
    let (queue, receiver) = work_queue(1);
    let queue = queue.with_poll_interval(Duration::from_millis(10));
    let guard = receiver.register();

    queue.enqueue(item(1)).await.unwrap();

    let dropper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(guard);
    });

    let result = tokio::time::timeout(Duration::from_secs(5), queue.enqueue(item(2))).await;
    dropper.await.unwrap();

    assert!(matches!(result, Ok(Err(QueueError::NoConsumers))));
    assert_eq!(queue.send_shutdown(3).await.unwrap(), 0);
}

/// Test backpressure: a full queue accepts more once a consumer takes an item
#[tokio::test]
async fn test_backpressure() {
    let (queue, receiver) = work_queue(1);
    let queue = queue.with_poll_interval(Duration::from_millis(10));
    let _guard = receiver.register();

    queue.enqueue(item(1)).await.unwrap();

    let consumer = {
        let receiver = receiver.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            receiver.dequeue(Duration::from_secs(1)).await
        })
    };

    queue.enqueue(item(2)).await.unwrap();
    assert_eq!(consumer.await.unwrap(), Dequeued::Work(item(1)));
    assert_eq!(
        receiver.dequeue(Duration::from_secs(1)).await,
        Dequeued::Work(item(2))
    );
}

/// Test concurrent consumers each receive distinct items
#[tokio::test]
async fn test_concurrent_consumers_share_work() {
    let (queue, receiver) = work_queue(8);
    let workers = 4;
    let total = 40;

    let mut handles = Vec::new();
    for _ in 0..workers {
        let receiver = receiver.clone();
        let guard = receiver.register();
        handles.push(tokio::spawn(async move {
            let _guard = guard;
            let mut seen = Vec::new();
            loop {
                match receiver.dequeue(Duration::from_secs(5)).await {
                    Dequeued::Work(item) => seen.push(item.source_path),
                    _ => break,
                }
            }
            seen
        }));
    }

    for n in 0..total {
        queue.enqueue(item(n)).await.unwrap();
    }
    queue.send_shutdown(workers).await.unwrap();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort();
    all.dedup();
    assert_eq!(all.len(), total);
}
