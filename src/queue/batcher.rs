//! In-process buffer coalescing like events into published batches.

use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::cache::lock::mutex_lock;

use super::events::{LikeBatch, LikeEvent};
use super::publisher::BatchPublisher;

const SOURCE: &str = "queue::batcher";

const METRIC_BATCH_PUBLISHED: &str = "brusio_like_batch_published_total";
const METRIC_BATCH_DROPPED: &str = "brusio_like_batch_dropped_total";
const METRIC_BUFFER_LEN: &str = "brusio_like_buffer_len";
const METRIC_FLUSH_MS: &str = "brusio_like_batch_flush_ms";

const DEFAULT_MAX_BATCH: usize = 100;
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    /// Buffer length that triggers an immediate flush from `add`.
    pub max_batch: usize,
    /// Period of the background flush ticker.
    pub flush_interval: Duration,
    /// Capacity of the handoff channel to the flusher task. A full channel
    /// drops the batch instead of blocking the write path.
    pub channel_capacity: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl From<&crate::config::BatcherSettings> for BatcherConfig {
    fn from(settings: &crate::config::BatcherSettings) -> Self {
        Self {
            max_batch: settings.max_batch.get(),
            flush_interval: Duration::from_millis(settings.flush_interval_ms.get()),
            channel_capacity: settings.channel_capacity.get(),
        }
    }
}

/// Accumulates like events and flushes them as one batch when the buffer
/// reaches `max_batch` or the flush ticker fires with a non-empty buffer.
///
/// One mutex guards the buffer for both append and swap-on-flush, so a
/// concurrent `add` can never land between "read buffer" and "clear
/// buffer". All broker interaction happens on a single dedicated flusher
/// task fed through a bounded channel; nothing on the write path awaits
/// the broker.
pub struct LikeEventBatcher {
    buffer: Mutex<Vec<LikeEvent>>,
    flush_tx: Mutex<Option<mpsc::Sender<LikeBatch>>>,
    max_batch: usize,
}

/// Join handles for the batcher's background tasks.
pub struct BatcherHandle {
    ticker: JoinHandle<()>,
    flusher: JoinHandle<()>,
}

impl LikeEventBatcher {
    /// Start the batcher together with its ticker and flusher tasks.
    pub fn spawn(
        config: BatcherConfig,
        publisher: Arc<dyn BatchPublisher>,
    ) -> (Arc<Self>, BatcherHandle) {
        let (flush_tx, mut flush_rx) = mpsc::channel::<LikeBatch>(config.channel_capacity.max(1));

        let batcher = Arc::new(Self {
            buffer: Mutex::new(Vec::new()),
            flush_tx: Mutex::new(Some(flush_tx)),
            max_batch: config.max_batch.max(1),
        });

        let flusher = tokio::spawn(async move {
            while let Some(batch) = flush_rx.recv().await {
                let count = batch.len();
                let flush_started_at = Instant::now();
                match publisher.publish(batch).await {
                    Ok(()) => {
                        counter!(METRIC_BATCH_PUBLISHED).increment(1);
                        info!(
                            target_module = SOURCE,
                            count, "published like event batch"
                        );
                    }
                    Err(err) => {
                        // The overlay already made the toggles visible to
                        // their users; this is consistency debt, not a
                        // user-facing failure.
                        counter!(METRIC_BATCH_DROPPED).increment(1);
                        error!(
                            target_module = SOURCE,
                            count,
                            error = %err,
                            "failed to publish like event batch, dropping it"
                        );
                    }
                }
                histogram!(METRIC_FLUSH_MS)
                    .record(flush_started_at.elapsed().as_secs_f64() * 1000.0);
            }
        });

        let ticker_batcher = batcher.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.flush_interval);
            interval.tick().await; // skip the immediate first tick
            loop {
                interval.tick().await;
                ticker_batcher.flush_now();
            }
        });

        (batcher, BatcherHandle { ticker, flusher })
    }

    /// Buffer one event. Reaching `max_batch` swaps the buffer out under
    /// the same lock and hands it to the flusher before returning.
    pub fn add(&self, event: LikeEvent) {
        let full = {
            let mut buffer = mutex_lock(&self.buffer, SOURCE, "add");
            buffer.push(event);
            gauge!(METRIC_BUFFER_LEN).set(buffer.len() as f64);
            if buffer.len() >= self.max_batch {
                Some(mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(events) = full {
            gauge!(METRIC_BUFFER_LEN).set(0.0);
            self.dispatch(events);
        }
    }

    /// Swap out whatever is buffered and hand it to the flusher. A no-op
    /// on an empty buffer.
    pub fn flush_now(&self) {
        let events = {
            let mut buffer = mutex_lock(&self.buffer, SOURCE, "flush_now");
            mem::take(&mut *buffer)
        };

        if events.is_empty() {
            return;
        }

        gauge!(METRIC_BUFFER_LEN).set(0.0);
        self.dispatch(events);
    }

    /// Current number of buffered events.
    pub fn buffered(&self) -> usize {
        mutex_lock(&self.buffer, SOURCE, "buffered").len()
    }

    fn dispatch(&self, events: Vec<LikeEvent>) {
        let sender = mutex_lock(&self.flush_tx, SOURCE, "dispatch");
        let Some(sender) = sender.as_ref() else {
            counter!(METRIC_BATCH_DROPPED).increment(1);
            warn!(
                target_module = SOURCE,
                count = events.len(),
                "batcher is shut down, dropping batch"
            );
            return;
        };

        match sender.try_send(LikeBatch::new(events)) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => {
                counter!(METRIC_BATCH_DROPPED).increment(1);
                warn!(
                    target_module = SOURCE,
                    count = batch.len(),
                    "flush channel is full, dropping batch"
                );
            }
            Err(TrySendError::Closed(batch)) => {
                counter!(METRIC_BATCH_DROPPED).increment(1);
                warn!(
                    target_module = SOURCE,
                    count = batch.len(),
                    "flush channel is closed, dropping batch"
                );
            }
        }
    }

    fn close(&self) -> Option<mpsc::Sender<LikeBatch>> {
        mutex_lock(&self.flush_tx, SOURCE, "close").take()
    }
}

impl BatcherHandle {
    /// Stop the ticker, flush the remaining buffer, and wait for the
    /// flusher to drain the handoff channel.
    pub async fn shutdown(self, batcher: &LikeEventBatcher) {
        self.ticker.abort();
        let _ = self.ticker.await;

        batcher.flush_now();
        drop(batcher.close());

        if let Err(err) = self.flusher.await {
            error!(
                target_module = SOURCE,
                error = %err,
                "flusher task ended abnormally during shutdown"
            );
        }
    }
}
