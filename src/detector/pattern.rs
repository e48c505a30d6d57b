use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::config::PatternConfig;
use crate::detector::scannable;
use crate::state::SnapshotStore;
use crate::types::{DetectionEvent, PatternEvent};
use crate::window::WindowSnapshot;

/// Burst check over the newest `cfg.recent` engagements of one window.
///
/// Fires when `max > burst_ratio × mean` with a positive mean. Windows below
/// `cfg.min_samples` never fire.
pub fn detect_rapid_growth(
    snapshot: &WindowSnapshot,
    cfg: &PatternConfig,
    now: DateTime<Utc>,
) -> Option<PatternEvent> {
    if snapshot.len() < cfg.min_samples || cfg.recent == 0 {
        return None;
    }
    let recent = snapshot.recent(cfg.recent);
    let trigger = recent.last()?;

    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for s in recent {
        let e = s.engagement();
        max = max.max(e);
        sum += e;
    }
    let mean = sum / recent.len() as f64;
    if mean <= 0.0 || max <= cfg.burst_ratio * mean {
        return None;
    }

    Some(PatternEvent {
        window_id: snapshot.id.clone(),
        detected_at: now,
        trigger_signal_id: trigger.id,
        max_engagement: max,
        mean_engagement: mean,
        ratio: max / mean,
    })
}

/// Periodic burst scanner over every published window snapshot.
pub struct PatternDetector {
    store: Arc<SnapshotStore>,
    cfg: PatternConfig,
    event_tx: mpsc::Sender<DetectionEvent>,
    health: Arc<HealthState>,
    shutdown: watch::Receiver<bool>,
    /// window_id → trigger signal of the last emitted event
    last_trigger: HashMap<String, u64>,
}

impl PatternDetector {
    pub fn new(
        store: Arc<SnapshotStore>,
        cfg: PatternConfig,
        event_tx: mpsc::Sender<DetectionEvent>,
        health: Arc<HealthState>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { store, cfg, event_tx, health, shutdown, last_trigger: HashMap::new() }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.tick().await; // consume immediate first tick

        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan(Utc::now()),
                _ = self.shutdown.changed() => break,
            }
            if *self.shutdown.borrow() {
                break;
            }
        }
        info!("[PATTERN] detector stopped");
    }

    fn scan(&mut self, now: DateTime<Utc>) {
        for snapshot in self.store.all() {
            if !scannable(&snapshot) {
                warn!(window = %snapshot.id, "[PATTERN] skipping window with non-finite engagement sums");
                continue;
            }
            let Some(event) = detect_rapid_growth(&snapshot, &self.cfg, now) else {
                self.last_trigger.remove(&snapshot.id);
                continue;
            };
            if self.last_trigger.get(&snapshot.id) == Some(&event.trigger_signal_id) {
                continue;
            }
            self.last_trigger.insert(snapshot.id.clone(), event.trigger_signal_id);
            debug!(window = %event.window_id, ratio = event.ratio, "[PATTERN] rapid growth");
            self.health.inc_patterns();
            if let Err(e) = self.event_tx.try_send(DetectionEvent::RapidGrowth(event)) {
                warn!("Detection event channel full: {e}");
            }
        }
    }
}
