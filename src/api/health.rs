//! Shared health state for the /health endpoint.
//! Updated by the signal sender, ingest consumer, detectors and stats task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Shared pipeline counters. Updated by pipeline components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True from pipeline start until shutdown begins.
    running: AtomicBool,
    /// Signals that made it into the queue.
    accepted: AtomicU64,
    /// Signals enhanced and folded into the windows.
    processed: AtomicU64,
    /// Malformed signals skipped by the consumer.
    skipped: AtomicU64,
    /// Signals whose enhancement failed and were kept with neutral scores.
    degraded: AtomicU64,
    /// Enqueue attempts rejected because the queue stayed full.
    dropped: AtomicU64,
    /// Queued signals discarded during shutdown.
    discarded: AtomicU64,
    patterns: AtomicU64,
    anomalies: AtomicU64,
    /// Processed signals per second over the last stats interval, ×1000.
    throughput_milli: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub running: bool,
    pub accepted: u64,
    pub processed: u64,
    pub skipped: u64,
    pub degraded: u64,
    pub dropped: u64,
    pub discarded: u64,
    pub patterns: u64,
    pub anomalies: u64,
    pub throughput_per_sec: f64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, v: bool) {
        self.running.store(v, Ordering::Relaxed);
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_discarded(&self, n: u64) {
        self.discarded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_patterns(&self) {
        self.patterns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_anomalies(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_throughput(&self, per_sec: f64) {
        let milli = if per_sec.is_finite() && per_sec > 0.0 { (per_sec * 1000.0).round() as u64 } else { 0 };
        self.throughput_milli.store(milli, Ordering::Relaxed);
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn degraded(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn patterns(&self) -> u64 {
        self.patterns.load(Ordering::Relaxed)
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    pub fn throughput(&self) -> f64 {
        self.throughput_milli.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            running: self.running(),
            accepted: self.accepted(),
            processed: self.processed(),
            skipped: self.skipped(),
            degraded: self.degraded(),
            dropped: self.dropped(),
            discarded: self.discarded(),
            patterns: self.patterns(),
            anomalies: self.anomalies(),
            throughput_per_sec: self.throughput(),
        }
    }
}
