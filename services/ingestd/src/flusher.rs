//! Periodic buffer-to-sink flusher.
//!
//! Flushes are serialized through an async mutex so the interval task, the
//! manual flush endpoint, and the shutdown path never interleave two bulk
//! inserts. The drain happens before the insert and drained readings are
//! never re-queued, so each reading is written at most once; a sink outage
//! loses that batch and the loss is reported, not retried.
use crate::sink::ReadingSink;
use acequia_buffer::ReadingBuffer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

/// Outcome of one flush cycle, also the manual flush response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlushReport {
    /// Readings taken out of the buffer.
    pub drained: usize,
    /// Rows the sink accepted.
    pub inserted: usize,
    /// Rows the sink refused individually (duplicates).
    pub rejected: usize,
    /// Set when the sink failed; drained rows beyond `inserted` are lost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Flusher {
    buffer: Arc<ReadingBuffer>,
    sink: Arc<dyn ReadingSink>,
    in_flight: Mutex<()>,
}

impl Flusher {
    pub fn new(buffer: Arc<ReadingBuffer>, sink: Arc<dyn ReadingSink>) -> Self {
        Self {
            buffer,
            sink,
            in_flight: Mutex::new(()),
        }
    }

    /// Drain the buffer and bulk-insert the batch. Concurrent callers queue
    /// behind the in-flight flush; a later caller then drains whatever
    /// arrived in the meantime.
    pub async fn flush(&self) -> FlushReport {
        let _guard = self.in_flight.lock().await;
        let drained = self.buffer.drain();
        if drained.is_empty() {
            return FlushReport {
                drained: 0,
                inserted: 0,
                rejected: 0,
                error: None,
            };
        }
        match self.sink.insert_many(&drained).await {
            Ok(outcome) => {
                metrics::counter!("acequia_flush_inserted_total")
                    .increment(outcome.inserted as u64);
                if outcome.rejected > 0 {
                    metrics::counter!("acequia_flush_rejected_total")
                        .increment(outcome.rejected as u64);
                    tracing::warn!(
                        rejected = outcome.rejected,
                        inserted = outcome.inserted,
                        "sink rejected rows during flush"
                    );
                }
                FlushReport {
                    drained: drained.len(),
                    inserted: outcome.inserted,
                    rejected: outcome.rejected,
                    error: None,
                }
            }
            Err(err) => {
                // The sink may have written part of the batch before giving
                // up; those rows are durable and still count.
                let inserted = err.inserted();
                let lost = drained.len() - inserted;
                metrics::counter!("acequia_flush_inserted_total").increment(inserted as u64);
                metrics::counter!("acequia_flush_lost_total").increment(lost as u64);
                tracing::error!(error = %err, inserted, lost, "flush failed, remainder lost");
                FlushReport {
                    drained: drained.len(),
                    inserted,
                    rejected: 0,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Handle to the background flush task. `shutdown` stops the timer and
/// waits for the task's final flush.
pub struct FlusherHandle {
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl FlusherHandle {
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "flusher task panicked");
        }
    }
}

/// Spawn the interval flush task. On shutdown the timer stops first, then
/// one final flush runs, bounded by `final_timeout` so shutdown cannot hang
/// on an unreachable sink.
pub fn spawn(flusher: Arc<Flusher>, interval: Duration, final_timeout: Duration) -> FlusherHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick resolves immediately; skip it so the first real
        // flush happens one interval after startup.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = flusher.flush().await;
                    tracing::info!(
                        drained = report.drained,
                        inserted = report.inserted,
                        rejected = report.rejected,
                        "interval flush complete"
                    );
                }
                _ = &mut stop_rx => break,
            }
        }
        match tokio::time::timeout(final_timeout, flusher.flush()).await {
            Ok(report) => tracing::info!(
                drained = report.drained,
                inserted = report.inserted,
                "final flush complete"
            ),
            Err(_) => tracing::error!("final flush timed out, buffered readings lost"),
        }
    });
    FlusherHandle {
        stop: stop_tx,
        task,
    }
}
