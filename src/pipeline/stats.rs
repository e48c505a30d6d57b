use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::pipeline::sender::SignalSender;
use crate::state::{KeywordActivity, SnapshotStore};

/// Queue usage above this fraction is logged as a warning.
const QUEUE_WARN_RATIO: f64 = 0.8;

/// Periodic throughput/queue logger. Also ages out stale keyword activity.
pub struct StatsReporter {
    health: Arc<HealthState>,
    store: Arc<SnapshotStore>,
    activity: Arc<KeywordActivity>,
    sender: SignalSender,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    last_processed: u64,
    last_at: Instant,
}

impl StatsReporter {
    pub fn new(
        health: Arc<HealthState>,
        store: Arc<SnapshotStore>,
        activity: Arc<KeywordActivity>,
        sender: SignalSender,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            health,
            store,
            activity,
            sender,
            interval,
            shutdown,
            last_processed: 0,
            last_at: Instant::now(),
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.report(),
                _ = self.shutdown.changed() => break,
            }
            if *self.shutdown.borrow() {
                break;
            }
        }
    }

    fn report(&mut self) {
        let processed = self.health.processed();
        let elapsed = self.last_at.elapsed().as_secs_f64();
        let per_sec = if elapsed > 0.0 {
            processed.saturating_sub(self.last_processed) as f64 / elapsed
        } else {
            0.0
        };
        self.health.set_throughput(per_sec);
        self.last_processed = processed;
        self.last_at = Instant::now();

        let keywords = self.activity.evict_stale(Utc::now());
        let depth = self.sender.queue_depth();
        let capacity = self.sender.queue_capacity();
        let usage = depth as f64 / capacity.max(1) as f64;
        let window_sizes: Vec<String> = self
            .store
            .all()
            .iter()
            .map(|s| format!("{}={}", s.id, s.len()))
            .collect();

        info!(
            throughput = format_args!("{per_sec:.1}"),
            processed,
            dropped = self.health.dropped(),
            skipped = self.health.skipped(),
            degraded = self.health.degraded(),
            queue_depth = depth,
            keywords,
            "[STATS] {:.1} signals/s | queue {}/{} | windows: {}",
            per_sec,
            depth,
            capacity,
            window_sizes.join(" "),
        );
        if usage > QUEUE_WARN_RATIO {
            warn!(queue_depth = depth, capacity, "[STATS] ingest queue {:.0}% full", usage * 100.0);
        }
    }
}
