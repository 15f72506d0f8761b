use hdrhistogram::Histogram;
use serde::Serialize;

/// Latency summary (μs) for store batch writes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Zeroed when the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::empty();
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_quantile(0.50),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
            p999: hist.value_at_quantile(0.999),
            count: hist.len(),
        }
    }

    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            p999: 0,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_is_all_zero() {
        let hist = Histogram::<u64>::new(3).unwrap();
        assert_eq!(PercentileSet::from_histogram(&hist), PercentileSet::empty());
    }

    #[test]
    fn single_value_fills_every_percentile() {
        let mut hist = Histogram::<u64>::new(3).unwrap();
        hist.record(1_000).unwrap();
        let set = PercentileSet::from_histogram(&hist);
        assert_eq!(set.count, 1);
        assert_eq!(set.p50, set.p999);
        assert!(set.min <= 1_000 && set.max >= 1_000);
    }
}
