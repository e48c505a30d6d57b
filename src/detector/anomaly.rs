use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::config::AnomalyConfig;
use crate::detector::scannable;
use crate::state::SnapshotStore;
use crate::stats::std_dev_from_sums;
use crate::types::{AnomalyEvent, DetectionEvent};
use crate::window::WindowSnapshot;

/// Relative spread below which a baseline counts as flat.
const FLAT_EPSILON: f64 = 1e-12;

fn all_equal<I: IntoIterator<Item = f64>>(values: I) -> bool {
    let mut iter = values.into_iter();
    match iter.next() {
        Some(first) => iter.all(|v| v == first),
        None => true,
    }
}

/// Sigma-rule outliers among the newest `cfg.recent` entries of one window.
///
/// Each candidate is measured against the rest of the window (leave-one-out
/// mean and population std dev, derived from the snapshot's running sums).
/// Windows where every engagement is identical, or whose recent subset is
/// identical, never produce anomalies.
pub fn detect_anomalies(snapshot: &WindowSnapshot, cfg: &AnomalyConfig, now: DateTime<Utc>) -> Vec<AnomalyEvent> {
    let n = snapshot.len();
    if n < cfg.min_samples || n < 2 {
        return Vec::new();
    }
    let recent = snapshot.recent(cfg.recent);
    if all_equal(recent.iter().map(|s| s.engagement()))
        || all_equal(snapshot.signals.iter().map(|s| s.engagement()))
    {
        return Vec::new();
    }

    let rest = (n - 1) as f64;
    let mut events = Vec::new();
    for signal in recent {
        let e = signal.engagement();
        let sum = snapshot.engagement_sum - e;
        let sum_sq = snapshot.engagement_sum_sq - e * e;
        let mean = sum / rest;
        let std_dev = std_dev_from_sums(rest, sum, sum_sq);
        let deviation = (e - mean).abs();
        let scale = FLAT_EPSILON * mean.abs().max(1.0);

        let z_score = if std_dev > scale {
            let z = deviation / std_dev;
            if z <= cfg.sigma {
                continue;
            }
            Some(z)
        } else if deviation > scale {
            None
        } else {
            continue;
        };

        events.push(AnomalyEvent {
            window_id: snapshot.id.clone(),
            detected_at: now,
            signal_id: signal.id,
            signal_timestamp: signal.timestamp(),
            engagement: e,
            baseline_mean: mean,
            baseline_std_dev: std_dev,
            z_score,
        });
    }
    events
}

/// Periodic outlier scanner. Each signal is reported at most once per window.
pub struct AnomalyDetector {
    store: Arc<SnapshotStore>,
    cfg: AnomalyConfig,
    event_tx: mpsc::Sender<DetectionEvent>,
    health: Arc<HealthState>,
    shutdown: watch::Receiver<bool>,
    /// window_id → signal ids already reported and still inside the window
    reported: HashMap<String, HashSet<u64>>,
}

impl AnomalyDetector {
    pub fn new(
        store: Arc<SnapshotStore>,
        cfg: AnomalyConfig,
        event_tx: mpsc::Sender<DetectionEvent>,
        health: Arc<HealthState>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { store, cfg, event_tx, health, shutdown, reported: HashMap::new() }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan(Utc::now()),
                _ = self.shutdown.changed() => break,
            }
            if *self.shutdown.borrow() {
                break;
            }
        }
        info!("[ANOMALY] detector stopped");
    }

    fn scan(&mut self, now: DateTime<Utc>) {
        for snapshot in self.store.all() {
            if !scannable(&snapshot) {
                warn!(window = %snapshot.id, "[ANOMALY] skipping window with non-finite engagement sums");
                continue;
            }
            let events = detect_anomalies(&snapshot, &self.cfg, now);

            let reported = self.reported.entry(snapshot.id.clone()).or_default();
            if !reported.is_empty() {
                let live: HashSet<u64> = snapshot.signals.iter().map(|s| s.id).collect();
                reported.retain(|id| live.contains(id));
            }

            for event in events {
                if !reported.insert(event.signal_id) {
                    continue;
                }
                debug!(
                    window = %event.window_id,
                    engagement = event.engagement,
                    baseline = event.baseline_mean,
                    "[ANOMALY] outlier"
                );
                self.health.inc_anomalies();
                if let Err(e) = self.event_tx.try_send(DetectionEvent::Anomaly(event)) {
                    warn!("Detection event channel full: {e}");
                }
            }
        }
    }
}
