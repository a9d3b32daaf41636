//! Bounded worker pool for chat update processing.
//!
//! The webhook route answers Telegram immediately; updates are queued here
//! and drained by a fixed set of workers, so a burst of updates cannot spawn
//! unbounded tasks or stall the HTTP response on chat delivery.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Number of concurrent update workers.
pub const WORKER_COUNT: usize = 4;
/// Updates queued beyond this are rejected until a worker catches up.
pub const QUEUE_CAPACITY: usize = 64;

/// The queue is at capacity; the submitted item was not accepted.
#[derive(Debug, PartialEq, Eq)]
pub struct QueueFull;

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker queue is full")
    }
}

impl std::error::Error for QueueFull {}

/// Fixed-size pool of workers draining a bounded queue. Each item is
/// handled by exactly one worker.
pub struct WorkerPool<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `workers` tasks sharing one receiver over a queue of
    /// `capacity` items. Workers exit when every pool handle is dropped and
    /// the queue drains.
    pub fn spawn<F, Fut>(workers: usize, capacity: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(Mutex::new(rx));

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let handler = handler.clone();
            tokio::spawn(async move {
                loop {
                    // The lock is held only while waiting for the next item,
                    // not while handling it.
                    let item = rx.lock().await.recv().await;
                    match item {
                        Some(item) => handler(item).await,
                        None => break,
                    }
                }
            });
        }

        Self { tx }
    }

    /// Hand an item to the pool without waiting. Back-pressure is rejection:
    /// a full queue returns `QueueFull` and the item is dropped.
    pub fn try_submit(&self, item: T) -> Result<(), QueueFull> {
        self.tx.try_send(item).map_err(|_| QueueFull)
    }
}
