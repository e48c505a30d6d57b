//! In-memory latency histogram for ingest instrumentation.
//! Records time from enqueue to the signal landing in the windows.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

const MAX_US: u64 = 100_000_000;

/// Shared latency stats. Ingest consumer records, API reads.
/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

impl LatencyStats {
    /// Tracks 1us to 100s, 3 significant figures. Longer samples are clamped.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, MAX_US, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.saturating_record(us.clamp(1, MAX_US));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        (Some(h.value_at_quantile(0.5)), Some(h.value_at_quantile(0.95)), Some(h.value_at_quantile(0.99)))
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> LatencySummary {
        let (p50_us, p95_us, p99_us) = self.percentiles();
        LatencySummary { samples: self.len(), p50_us, p95_us, p99_us }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
