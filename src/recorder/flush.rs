use std::time::Instant;

use tracing::{debug, error, warn};

use super::Recorder;
use crate::metrics::BatchSample;
use crate::store::{BatchReport, StoreError};
use crate::tick::Tick;

/// What one flush invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub batches: usize,
    pub report: BatchReport,
    /// Ticks put back at the front of the buffer after a failed write.
    pub rolled_back: usize,
    pub error: Option<StoreError>,
}

impl FlushSummary {
    pub fn written(&self) -> usize {
        self.report.total()
    }
}

/// Whether a failed write should switch the recorder offline.
///
/// Unexpected errors are treated like outages: the store may be unhealthy,
/// so stop hammering it and let the monitor decide when it is back. Narrow
/// this match to split real bugs from outages.
pub fn takes_store_offline(err: &StoreError) -> bool {
    match err {
        StoreError::Unavailable(_) => true,
        StoreError::Unexpected(_) => true,
    }
}

impl Recorder {
    /// Periodic entry point.
    pub async fn background_flush(&self) {
        self.flush_if_possible().await;
    }

    /// Drains and writes up to the per-cycle cap while the store is up.
    ///
    /// A no-op when offline or when another flush is already in flight.
    /// Stops at the first failed batch, which goes back to the front of the
    /// buffer; earlier batches of the same cycle stay committed.
    pub async fn flush_if_possible(&self) -> FlushSummary {
        if !self.connectivity.is_up() {
            return FlushSummary::default();
        }
        let Ok(_gate) = self.flush_gate.try_lock() else {
            return FlushSummary::default();
        };
        self.flush_cycle().await
    }

    /// Like `flush_if_possible`, but waits for an in-flight flush instead of
    /// skipping.
    pub(crate) async fn flush_waiting(&self) -> FlushSummary {
        let _gate = self.flush_gate.lock().await;
        if !self.connectivity.is_up() {
            return FlushSummary::default();
        }
        self.flush_cycle().await
    }

    async fn flush_cycle(&self) -> FlushSummary {
        let mut summary = FlushSummary::default();
        let batch_size = self.config.flush_batch_size;
        let cap = self.config.max_drain_per_cycle;
        let mut drained = 0;

        while drained < cap {
            let batch = self.buffer.drain_up_to(batch_size.min(cap - drained));
            if batch.is_empty() {
                break;
            }
            drained += batch.len();

            let started = Instant::now();
            let result = self.store.insert_batch(&batch).await;
            let write_us = started.elapsed().as_micros() as u64;

            match result {
                Ok(report) => {
                    self.metrics.record_batch(BatchSample {
                        size: batch.len(),
                        inserted: report.inserted,
                        duplicates: report.duplicates,
                        write_us,
                        success: true,
                    });
                    debug!(
                        size = batch.len(),
                        inserted = report.inserted,
                        duplicates = report.duplicates,
                        write_us,
                        "batch flushed"
                    );
                    summary.batches += 1;
                    summary.report.inserted += report.inserted;
                    summary.report.duplicates += report.duplicates;
                }
                Err(err) => {
                    self.metrics.record_batch(BatchSample {
                        size: batch.len(),
                        inserted: 0,
                        duplicates: 0,
                        write_us,
                        success: false,
                    });
                    summary.rolled_back = batch.len();
                    self.roll_back(batch);
                    self.on_write_failure(&err);
                    summary.error = Some(err);
                    break;
                }
            }
        }

        summary
    }

    fn on_write_failure(&self, err: &StoreError) {
        if !takes_store_offline(err) {
            warn!(%err, "batch write failed; batch kept for the next cycle");
            return;
        }

        self.connectivity.mark_down();
        let cooldown_secs = self.connectivity.cooldown().as_secs_f64();
        match err {
            StoreError::Unavailable(cause) => error!(
                %cause,
                buffered = self.buffer.len(),
                "store unavailable, going offline; probing every {cooldown_secs}s"
            ),
            StoreError::Unexpected(cause) => error!(
                %cause,
                buffered = self.buffer.len(),
                "unexpected error writing batch, going offline"
            ),
        }
    }

    fn roll_back(&self, batch: Vec<Tick>) {
        let discarded = self.buffer.restore_front(batch);
        if discarded > 0 {
            let total = self.count_dropped(discarded as u64);
            warn!(
                discarded,
                dropped_total = total,
                "buffer refilled during write; oldest rolled-back ticks discarded"
            );
        }
    }
}
