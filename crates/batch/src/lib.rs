//! MeterHub Batcher
//!
//! Generic size/time-bound accumulate-and-flush primitive. Events from every
//! connection interleave into one shared buffer; a single worker task hands
//! the whole buffer to the configured sink whenever the size threshold is
//! reached or the oldest buffered item has waited longer than the configured
//! delay.
//!
//! A `max_delay` of zero disables the time trigger entirely: batching then
//! degenerates to a pure size threshold and no timer is ever armed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Receives each flushed batch as one call, in enqueue order.
///
/// A failing sink drops the batch: the error is logged by the worker and the
/// items are not re-delivered.
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    async fn flush(&self, batch: Vec<T>) -> anyhow::Result<()>;
}

/// Batcher sizing and timing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Flush as soon as this many items are buffered.
    pub max_batch_size: usize,
    /// Flush once the oldest unflushed item has waited this long.
    /// Zero disables the time trigger.
    pub max_delay: Duration,
    /// Hard bound on the shared buffer. Items beyond it are shed with a
    /// warning instead of growing the buffer without limit.
    pub max_buffered: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_delay: Duration::ZERO,
            max_buffered: 8000,
        }
    }
}

struct Buffer<T> {
    items: Vec<T>,
    /// Enqueue time of the oldest unflushed item; `None` while empty.
    oldest: Option<Instant>,
}

impl<T> Buffer<T> {
    fn take(&mut self) -> Vec<T> {
        self.oldest = None;
        std::mem::take(&mut self.items)
    }
}

/// Shared accumulate-and-flush service.
///
/// One worker task performs every sink call, so flushes never overlap. The
/// buffer is swapped out atomically under the mutex before the sink runs,
/// and enqueues land in the fresh buffer while the flush is in flight.
pub struct Batcher<T> {
    buffer: Arc<Mutex<Buffer<T>>>,
    notify: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    sink: Arc<dyn BatchSink<T>>,
    config: BatchConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Batcher<T> {
    /// Create the batcher and start its flush worker.
    pub fn new(config: BatchConfig, sink: Arc<dyn BatchSink<T>>) -> Self {
        assert!(config.max_batch_size > 0, "max_batch_size must be positive");
        let config = BatchConfig {
            // The buffer must at least hold one full batch.
            max_buffered: config.max_buffered.max(config.max_batch_size),
            ..config
        };

        let buffer = Arc::new(Mutex::new(Buffer {
            items: Vec::new(),
            oldest: None,
        }));
        let notify = Arc::new(Notify::new());
        let stopping = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(run_worker(
            buffer.clone(),
            notify.clone(),
            stopping.clone(),
            sink.clone(),
            config.clone(),
        ));

        Self {
            buffer,
            notify,
            stopping,
            sink,
            config,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append items to the buffer, waking the worker if a flush is due or a
    /// delay timer needs arming.
    pub async fn enqueue(&self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }

        let mut buffer = self.buffer.lock().await;
        let was_empty = buffer.items.is_empty();

        let room = self.config.max_buffered.saturating_sub(buffer.items.len());
        if items.len() > room {
            warn!(
                dropped = items.len() - room,
                capacity = self.config.max_buffered,
                "batch buffer full, shedding incoming items"
            );
        }
        buffer.items.extend(items.into_iter().take(room));

        if buffer.oldest.is_none() && !buffer.items.is_empty() {
            buffer.oldest = Some(Instant::now());
        }

        let due_size = buffer.items.len() >= self.config.max_batch_size;
        let arm_timer =
            was_empty && !buffer.items.is_empty() && self.config.max_delay > Duration::ZERO;
        drop(buffer);

        if due_size || arm_timer {
            self.notify.notify_one();
        }
    }

    /// Number of currently buffered (unflushed) items.
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.items.len()
    }

    /// Stop the worker and flush whatever is still buffered. Part of the
    /// graceful-shutdown path; enqueues after this are not flushed.
    pub async fn drain(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.notify.notify_one();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }

        let batch = self.buffer.lock().await.take();
        if batch.is_empty() {
            return;
        }
        debug!(len = batch.len(), "flushing remaining items on drain");
        if let Err(error) = self.sink.flush(batch).await {
            warn!(%error, "final flush failed, dropping batch");
        }
    }
}

async fn run_worker<T: Send + 'static>(
    buffer: Arc<Mutex<Buffer<T>>>,
    notify: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    sink: Arc<dyn BatchSink<T>>,
    config: BatchConfig,
) {
    loop {
        if stopping.load(Ordering::SeqCst) {
            return;
        }

        let deadline = if config.max_delay > Duration::ZERO {
            buffer.lock().await.oldest.map(|t| t + config.max_delay)
        } else {
            None
        };

        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => notify.notified().await,
        }

        if stopping.load(Ordering::SeqCst) {
            return;
        }

        let batch = {
            let mut buffer = buffer.lock().await;
            let due_size = buffer.items.len() >= config.max_batch_size;
            let due_time = config.max_delay > Duration::ZERO
                && buffer
                    .oldest
                    .is_some_and(|t| t.elapsed() >= config.max_delay);
            if !due_size && !due_time {
                continue;
            }
            buffer.take()
        };
        if batch.is_empty() {
            continue;
        }

        debug!(len = batch.len(), "flushing batch");
        if let Err(error) = sink.flush(batch).await {
            warn!(%error, "batch flush failed, dropping batch");
        }
    }
}
