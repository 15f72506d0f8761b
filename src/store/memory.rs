use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BatchReport, InsertOutcome, StoreError, TickStore};
use crate::tick::Tick;

/// In-process store for running without Redis, with fault injection for
/// exercising the offline path.
#[derive(Default)]
pub struct MemoryTickStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    ticks: BTreeSet<Tick>,
    /// Newly inserted ticks in the order they arrived.
    arrivals: Vec<Tick>,
    unavailable: bool,
    batch_delay: Duration,
    /// 1-based `insert_batch` call number that fails once.
    fail_batch_call: Option<(usize, StoreError)>,
    batch_calls: usize,
    probe_calls: usize,
}

impl MemoryTickStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable` until switched back.
    pub fn set_available(&self, available: bool) {
        self.inner.lock().unavailable = !available;
    }

    /// Fails the `call`-th `insert_batch` (counting from 1, over the store's
    /// lifetime) with `err`, leaving the store untouched for that call.
    pub fn fail_batch_call(&self, call: usize, err: StoreError) {
        self.inner.lock().fail_batch_call = Some((call, err));
    }

    /// Holds every `insert_batch` for `delay` before applying it, so a
    /// write can be caught in flight.
    pub fn set_batch_delay(&self, delay: Duration) {
        self.inner.lock().batch_delay = delay;
    }

    pub fn seed(&self, ticks: impl IntoIterator<Item = Tick>) {
        self.inner.lock().ticks.extend(ticks);
    }

    pub fn stored(&self) -> Vec<Tick> {
        self.inner.lock().ticks.iter().copied().collect()
    }

    /// Ticks written through the trait, in arrival order. Seeded ticks and
    /// duplicates are not included.
    pub fn arrivals(&self) -> Vec<Tick> {
        self.inner.lock().arrivals.clone()
    }

    pub fn batch_calls(&self) -> usize {
        self.inner.lock().batch_calls
    }

    pub fn probe_calls(&self) -> usize {
        self.inner.lock().probe_calls
    }
}

impl Inner {
    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn insert(&mut self, tick: Tick) -> InsertOutcome {
        if self.ticks.insert(tick) {
            self.arrivals.push(tick);
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        }
    }
}

#[async_trait]
impl TickStore for MemoryTickStore {
    async fn insert_one(&self, tick: Tick) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_reachable()?;
        Ok(inner.insert(tick))
    }

    async fn insert_batch(&self, ticks: &[Tick]) -> Result<BatchReport, StoreError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.batch_calls += 1;
            inner.check_reachable()?;

            let calls = inner.batch_calls;
            if matches!(&inner.fail_batch_call, Some((call, _)) if *call == calls) {
                if let Some((_, err)) = inner.fail_batch_call.take() {
                    return Err(err);
                }
            }
            inner.batch_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        let mut report = BatchReport::default();
        for tick in ticks {
            let outcome = inner.insert(*tick);
            report.record(outcome);
        }
        Ok(report)
    }

    async fn probe_liveness(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.probe_calls += 1;
        inner.check_reachable()
    }

    async fn fetch_all(&self) -> Result<Vec<Tick>, StoreError> {
        let inner = self.inner.lock();
        inner.check_reachable()?;
        Ok(inner.ticks.iter().copied().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
