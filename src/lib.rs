//! Samples the clock once per second and records each tick in a store,
//! buffering in memory while the store is unreachable and replaying in
//! order once it returns.

use std::sync::Arc;

pub mod buffer;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod recorder;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod tick;

pub use buffer::TickBuffer;
pub use config::{Args, ConfigError, RecorderConfig, StoreKind};
pub use recorder::{ConnectivityState, FlushSummary, ProbeOutcome, Recorder};
pub use scheduler::Scheduler;
pub use store::{BatchReport, InsertOutcome, MemoryTickStore, RedisTickStore, StoreError, TickStore};
pub use tick::{PresentationZone, Tick};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub recorder: Arc<Recorder>,

    /// Read path for `GET /ticks`; the same store the recorder writes to.
    pub store: Arc<dyn TickStore>,

    pub metrics: Arc<metrics::MetricsCollector>,

    /// Zone ticks are presented in.
    pub time_zone: PresentationZone,
}
