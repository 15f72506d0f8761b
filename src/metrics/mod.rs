pub mod collector;
pub mod percentiles;
pub mod stream;

pub use collector::{MetricsCollector, MetricsSnapshot};

/// One store submission made by the flusher.
#[derive(Debug, Clone)]
pub struct BatchSample {
    /// Ticks submitted
    pub size: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Wall time of the store call in microseconds
    pub write_us: u64,
    /// false when the batch was rolled back
    pub success: bool,
}
