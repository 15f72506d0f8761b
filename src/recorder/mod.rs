//! The buffering and resilient-write core.
//!
//! One [`Recorder`] owns the tick buffer and the connectivity flag and
//! exposes the periodic entry points the scheduler drives:
//!
//! - [`Recorder::generate_tick`] appends the current second, evicting the
//!   oldest tick when full
//! - [`Recorder::background_flush`] drains batches into the store while Up
//! - [`Recorder::reconnect_loop`] probes the store while Down
//! - [`Recorder::shutdown_drain`] makes one last best-effort flush
//!
//! None of them return errors; failures are logged and absorbed.

mod connectivity;
mod flush;
mod monitor;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::buffer::TickBuffer;
use crate::config::RecorderConfig;
use crate::metrics::MetricsCollector;
use crate::store::TickStore;
use crate::tick::Tick;

pub use connectivity::{Connectivity, ConnectivityState};
pub use flush::{takes_store_offline, FlushSummary};
pub use monitor::ProbeOutcome;

pub struct Recorder {
    config: RecorderConfig,
    buffer: TickBuffer,
    connectivity: Connectivity,
    store: Arc<dyn TickStore>,
    metrics: Arc<MetricsCollector>,
    dropped: AtomicU64,
    /// Serialises flush cycles so store order follows buffer order.
    flush_gate: tokio::sync::Mutex<()>,
    shut_down: AtomicBool,
}

/// Point-in-time view for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub connectivity: ConnectivityState,
    pub buffered: usize,
    pub capacity: usize,
    pub dropped: u64,
    pub store: &'static str,
    pub secs_since_last_probe: Option<f64>,
}

impl Recorder {
    pub fn new(
        config: RecorderConfig,
        store: Arc<dyn TickStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            buffer: TickBuffer::new(config.buffer_capacity),
            connectivity: Connectivity::new(config.reconnect_cooldown),
            config,
            store,
            metrics,
            dropped: AtomicU64::new(0),
            flush_gate: tokio::sync::Mutex::new(()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn buffer(&self) -> &TickBuffer {
        &self.buffer
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Ticks lost to overflow since start.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            connectivity: self.connectivity.state(),
            buffered: self.buffer.len(),
            capacity: self.buffer.capacity(),
            dropped: self.dropped(),
            store: self.store.name(),
            secs_since_last_probe: self.connectivity.since_last_probe().map(|d| d.as_secs_f64()),
        }
    }

    // ─── Tick source ─────────────────────────────────────────────

    /// Periodic entry point: buffer the current second.
    pub fn generate_tick(&self) {
        self.record_tick(Tick::now());
    }

    /// Buffers `tick`. When full, the oldest buffered tick is dropped to
    /// make room: recent samples are worth more than stale ones.
    pub fn record_tick(&self, tick: Tick) {
        self.metrics.record_tick();
        if self.buffer.append_evicting(tick).is_some() {
            let total = self.count_dropped(1);
            warn!(
                dropped_total = total,
                capacity = self.buffer.capacity(),
                "tick buffer full, dropped oldest tick"
            );
        }
    }

    fn count_dropped(&self, n: u64) -> u64 {
        self.metrics.record_dropped(n);
        self.dropped.fetch_add(n, Ordering::Relaxed) + n
    }

    // ─── Shutdown ────────────────────────────────────────────────

    /// One last best-effort flush at teardown. Never fails; returns how many
    /// ticks were left unflushed. Only the first call flushes.
    pub async fn shutdown_drain(self: &Arc<Self>) -> usize {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return self.buffer.len();
        }

        // run on its own task so a panicking store cannot take teardown with it
        let recorder = Arc::clone(self);
        match tokio::spawn(async move { recorder.flush_waiting().await }).await {
            Ok(summary) => {
                if let Some(err) = summary.error {
                    warn!(%err, "final flush failed");
                }
            }
            Err(err) => warn!(%err, "final flush aborted"),
        }

        let residual = self.buffer.len();
        if residual > 0 {
            warn!(residual, "shutting down with unflushed ticks; they are lost");
        } else {
            info!("tick buffer fully flushed");
        }
        residual
    }
}
