use std::collections::VecDeque;
use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::PercentileSet;
use super::BatchSample;

// ─── Configuration ───────────────────────────────────────────────

/// How many individual batch outcomes we keep for the live feed
const MAX_RECENT_BATCHES: usize = 100;

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe counters for the recorder.
/// The tick source, flusher and monitor push in, HTTP handlers read snapshots.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// A single entry in the live batch feed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub timestamp_ms: u64,
    pub size: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub write_us: u64,
    pub success: bool,
}

/// A bucket in the write latency distribution.
#[derive(Debug, Clone, Serialize)]
pub struct DistBucket {
    pub range_start_us: u64,
    pub range_end_us: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub batch_write: PercentileSet,

    // Tick flow
    pub ticks_generated: u64,
    pub ticks_dropped: u64,
    pub ticks_flushed: u64,
    pub duplicates: u64,
    pub ticks_rolled_back: u64,

    // Store interaction
    pub batches_written: u64,
    pub batches_failed: u64,
    pub probes: u64,
    pub recoveries: u64,
    pub elapsed_secs: f64,

    pub recent_batches: Vec<BatchRecord>,
    pub distribution: Vec<DistBucket>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    write_hist: Histogram<u64>,

    ticks_generated: u64,
    ticks_dropped: u64,
    ticks_flushed: u64,
    duplicates: u64,
    ticks_rolled_back: u64,
    batches_written: u64,
    batches_failed: u64,
    probes: u64,
    recoveries: u64,

    recent_batches: VecDeque<BatchRecord>,
    start_time: Instant,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn record_batch(&self, sample: BatchSample) {
        self.inner.lock().record_batch(sample);
    }

    pub fn record_tick(&self) {
        self.inner.lock().ticks_generated += 1;
    }

    pub fn record_dropped(&self, n: u64) {
        self.inner.lock().ticks_dropped += n;
    }

    pub fn record_probe(&self, recovered: bool) {
        let mut inner = self.inner.lock();
        inner.probes += 1;
        if recovered {
            inner.recoveries += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            write_hist: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            ticks_generated: 0,
            ticks_dropped: 0,
            ticks_flushed: 0,
            duplicates: 0,
            ticks_rolled_back: 0,
            batches_written: 0,
            batches_failed: 0,
            probes: 0,
            recoveries: 0,
            recent_batches: VecDeque::with_capacity(MAX_RECENT_BATCHES + 1),
            start_time: Instant::now(),
        }
    }

    fn record_batch(&mut self, sample: BatchSample) {
        let _ = self.write_hist.record(sample.write_us.clamp(HIST_LOW, HIST_HIGH));

        if sample.success {
            self.batches_written += 1;
            self.ticks_flushed += sample.inserted as u64;
            self.duplicates += sample.duplicates as u64;
        } else {
            self.batches_failed += 1;
            self.ticks_rolled_back += sample.size as u64;
        }

        self.recent_batches.push_back(BatchRecord {
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            size: sample.size,
            inserted: sample.inserted,
            duplicates: sample.duplicates,
            write_us: sample.write_us,
            success: sample.success,
        });
        if self.recent_batches.len() > MAX_RECENT_BATCHES {
            self.recent_batches.pop_front();
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batch_write: PercentileSet::from_histogram(&self.write_hist),
            ticks_generated: self.ticks_generated,
            ticks_dropped: self.ticks_dropped,
            ticks_flushed: self.ticks_flushed,
            duplicates: self.duplicates,
            ticks_rolled_back: self.ticks_rolled_back,
            batches_written: self.batches_written,
            batches_failed: self.batches_failed,
            probes: self.probes,
            recoveries: self.recoveries,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
            recent_batches: self.recent_batches.iter().cloned().collect(),
            distribution: Self::compute_distribution(&self.write_hist),
        }
    }

    // ── Write latency distribution ──────────────────────────────

    /// Bucket boundaries (μs), from a local round-trip up to a stalled store.
    const DIST_BOUNDARIES: &'static [u64] = &[
        100, 250, 500, 1_000, 2_500, 5_000, 10_000, 25_000, 50_000, 100_000,
        250_000, 1_000_000,
    ];

    fn compute_distribution(hist: &Histogram<u64>) -> Vec<DistBucket> {
        if hist.len() == 0 {
            return Vec::new();
        }

        let bounds = Self::DIST_BOUNDARIES;
        let mut counts = vec![0u64; bounds.len() + 1];

        for iv in hist.iter_recorded() {
            // first boundary >= value; past the end is the overflow bucket
            let idx = match bounds.binary_search(&iv.value_iterated_to()) {
                Ok(i) | Err(i) => i,
            };
            counts[idx] += iv.count_at_value();
        }

        let mut result = Vec::with_capacity(counts.len());
        let mut prev = 0u64;
        for (i, &boundary) in bounds.iter().enumerate() {
            if counts[i] > 0 {
                result.push(DistBucket {
                    range_start_us: prev,
                    range_end_us: boundary,
                    count: counts[i],
                });
            }
            prev = boundary;
        }
        if counts[bounds.len()] > 0 {
            result.push(DistBucket {
                range_start_us: prev,
                range_end_us: hist.max(),
                count: counts[bounds.len()],
            });
        }

        result
    }
}
