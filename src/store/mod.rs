pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::tick::Tick;

pub use self::memory::MemoryTickStore;
pub use self::redis_store::RedisTickStore;

/// Outcome of writing a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The store already held this instant. Never fatal.
    Duplicate,
}

/// Per-batch tally. Duplicates are counted, not surfaced as failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub duplicates: usize,
}

impl BatchReport {
    pub fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.duplicates
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (refused, dropped, timed out, loading).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Anything the adapter could not classify as a connectivity problem.
    #[error("unexpected store error: {0}")]
    Unexpected(String),
}

/// Durable backing store for ticks.
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait TickStore: Send + Sync {
    async fn insert_one(&self, tick: Tick) -> Result<InsertOutcome, StoreError>;

    /// Applies `insert_one` semantics to each element. An error means the
    /// attempt as a whole failed; some elements may still have landed.
    async fn insert_batch(&self, ticks: &[Tick]) -> Result<BatchReport, StoreError>;

    /// Cheap liveness check; fails with the same categories as inserts.
    async fn probe_liveness(&self) -> Result<(), StoreError>;

    /// Every stored tick, oldest first.
    async fn fetch_all(&self) -> Result<Vec<Tick>, StoreError>;

    fn name(&self) -> &'static str;
}
