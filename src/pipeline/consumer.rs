use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::enhancer::SignalEnhancer;
use crate::pipeline::sender::QueuedSignal;
use crate::state::SnapshotStore;
use crate::types::EnhancedSignal;
use crate::window::WindowAggregator;

/// Sole writer of the rolling windows: drains the ingest queue, enhances each
/// signal and folds it into every window, then publishes snapshots on a tick.
pub struct IngestConsumer {
    rx: mpsc::Receiver<QueuedSignal>,
    enhancer: Arc<SignalEnhancer>,
    aggregator: WindowAggregator,
    store: Arc<SnapshotStore>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    snapshot_interval: Duration,
    shutdown: watch::Receiver<bool>,
    /// Windows changed since the last publish.
    dirty: bool,
}

impl IngestConsumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rx: mpsc::Receiver<QueuedSignal>,
        enhancer: Arc<SignalEnhancer>,
        aggregator: WindowAggregator,
        store: Arc<SnapshotStore>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
        snapshot_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            rx,
            enhancer,
            aggregator,
            store,
            health,
            latency,
            snapshot_interval,
            shutdown,
            dirty: true,
        }
    }

    /// Returns the number of queued signals discarded at shutdown.
    pub async fn run(mut self) -> u64 {
        self.publish();
        let mut ticker = tokio::time::interval(self.snapshot_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                _ = ticker.tick() => self.publish(),
                maybe = self.rx.recv() => match maybe {
                    Some(item) => self.ingest(item),
                    None => break,
                },
            }
            if *self.shutdown.borrow() {
                break;
            }
        }

        // Stop accepting, then discard whatever is still queued.
        self.store.seal();
        self.rx.close();
        let mut discarded = 0u64;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.health.add_discarded(discarded);
        info!(discarded, processed = self.health.processed(), "[INGEST] consumer stopped");
        discarded
    }

    fn ingest(&mut self, item: QueuedSignal) {
        let QueuedSignal { raw, enqueued_at } = item;
        if let Err(e) = raw.validate() {
            warn!(source = %raw.source, "Skipping signal: {e}");
            self.health.inc_skipped();
            return;
        }

        let signal = match self.enhancer.try_enhance(&raw) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(source = %raw.source, error = %e, "Enhancement failed, keeping neutral signal");
                self.health.inc_degraded();
                EnhancedSignal::neutral(raw)
            }
        };
        self.enhancer.activity().record(&signal);

        let accepted = self.aggregator.ingest(Arc::new(signal), Utc::now());
        if accepted == 0 {
            debug!("Signal older than every window, not retained");
        }
        self.latency.record(enqueued_at.elapsed());
        self.health.inc_processed();
        self.dirty = true;
    }

    fn publish(&mut self) {
        let now = Utc::now();
        let evicted = self.aggregator.trim_all(now);
        if !self.dirty && evicted == 0 {
            return;
        }
        self.store.publish_all(self.aggregator.snapshots(now));
        self.dirty = false;
    }
}
