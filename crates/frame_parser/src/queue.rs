//! NotificationQueue - FIFO delivery decoupled from the caller
//!
//! `enqueue` never blocks. A dedicated worker task drains items in arrival
//! order and calls the processing function once per item. A returned error or
//! a panic is handed to the error callback and the worker keeps going.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender};
use contracts::{panic_message, ContractError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::error::{ParserError, Result};

/// Queue counters
#[derive(Debug, Default)]
pub struct QueueMetrics {
    processed: AtomicU64,
    failures: AtomicU64,
}

impl QueueMetrics {
    /// Items handed to the processing function
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Items whose processing failed
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Single-consumer asynchronous delivery queue
pub struct NotificationQueue<T> {
    name: String,
    tx: Sender<T>,
    metrics: Arc<QueueMetrics>,
    worker_handle: JoinHandle<()>,
}

impl<T: Send + 'static> NotificationQueue<T> {
    /// Create the queue and spawn its worker on `runtime`
    pub fn spawn<P, E>(name: impl Into<String>, runtime: &Handle, process: P, on_error: E) -> Self
    where
        P: FnMut(T) -> std::result::Result<(), ContractError> + Send + 'static,
        E: Fn(ContractError) + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = unbounded();
        let metrics = Arc::new(QueueMetrics::default());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = runtime.spawn(async move {
            drain_worker(worker_name, rx, process, on_error, worker_metrics).await;
        });

        debug!(queue = %name, "notification queue created");

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an item (non-blocking)
    ///
    /// # Errors
    /// `QueueClosed` when the worker has gone away.
    pub fn enqueue(&self, item: T) -> Result<()> {
        self.tx.try_send(item).map_err(|_| ParserError::QueueClosed {
            queue: self.name.clone(),
        })
    }

    /// Items waiting for the worker
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }

    /// Stop accepting items, drain what is queued and wait for the worker
    #[instrument(name = "notification_queue_shutdown", skip(self), fields(queue = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(queue = %self.name, error = ?e, "queue worker panicked");
        }
        debug!(queue = %self.name, "notification queue shutdown complete");
    }
}

async fn drain_worker<T, P, E>(
    name: String,
    rx: Receiver<T>,
    mut process: P,
    on_error: E,
    metrics: Arc<QueueMetrics>,
) where
    P: FnMut(T) -> std::result::Result<(), ContractError>,
    E: Fn(ContractError),
{
    debug!(queue = %name, "queue worker started");

    while let Ok(item) = rx.recv().await {
        let failure = match catch_unwind(AssertUnwindSafe(|| process(item))) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(ContractError::ListenerFailure {
                event: name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };

        metrics.processed.fetch_add(1, Ordering::Relaxed);

        if let Some(err) = failure {
            metrics.failures.fetch_add(1, Ordering::Relaxed);
            error!(queue = %name, error = %err, "queued item processing failed");
            // Keep draining
            on_error(err);
        }
    }

    debug!(queue = %name, "queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_items_processed_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let queue = NotificationQueue::spawn(
            "ordered",
            &Handle::current(),
            move |item: u32| {
                sink.lock().unwrap().push(item);
                Ok(())
            },
            |_| {},
        );

        for i in 0..100 {
            queue.enqueue(i).unwrap();
        }
        let metrics = queue.metrics().clone();
        queue.shutdown().await;

        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
        assert_eq!(metrics.processed(), 100);
    }

    #[tokio::test]
    async fn test_failures_reported_and_worker_continues() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let handled = Arc::new(AtomicU64::new(0));
        let counter = handled.clone();

        let queue = NotificationQueue::spawn(
            "flaky",
            &Handle::current(),
            move |item: u32| {
                match item {
                    1 => return Err(ContractError::Other("item one rejected".into())),
                    2 => panic!("item two exploded"),
                    _ => {}
                }
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            move |err| sink.lock().unwrap().push(err.to_string()),
        );

        for i in 0..4 {
            queue.enqueue(i).unwrap();
        }
        let metrics = queue.metrics().clone();
        queue.shutdown().await;

        assert_eq!(handled.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.failures(), 2);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "item one rejected");
        assert!(errors[1].contains("item two exploded"));
    }
}
