//! Task wiring: bounded ingest queue → consumer → windows → snapshot store,
//! plus the periodic detector and statistics tasks.

pub mod consumer;
pub mod sender;
pub mod stats;

pub use consumer::IngestConsumer;
pub use sender::{QueuedSignal, SignalSender};
pub use stats::StatsReporter;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Config, EVENT_CHANNEL_CAPACITY};
use crate::detector::{AnomalyDetector, PatternDetector};
use crate::enhancer::SignalEnhancer;
use crate::error::Result;
use crate::state::{KeywordActivity, SnapshotStore};
use crate::types::DetectionEvent;
use crate::window::WindowAggregator;

pub struct Pipeline;

impl Pipeline {
    /// Validates the config and spawns every pipeline task on the current runtime.
    pub fn start(cfg: &Config) -> Result<PipelineHandle> {
        cfg.validate()?;

        let health = Arc::new(HealthState::new());
        let latency = Arc::new(LatencyStats::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let horizon = cfg
            .windows
            .iter()
            .map(|w| w.duration)
            .max()
            .unwrap_or_else(|| chrono::Duration::hours(1));
        let activity = Arc::new(KeywordActivity::new(horizon));
        let enhancer = Arc::new(SignalEnhancer::new(cfg.enhancer(), Arc::clone(&activity)));

        let store = SnapshotStore::new(cfg.windows.iter().map(|w| w.id.clone()).collect());
        let (signal_tx, signal_rx) = mpsc::channel(cfg.queue_capacity);
        let (event_tx, event_rx) = mpsc::channel::<DetectionEvent>(EVENT_CHANNEL_CAPACITY);
        let sender = SignalSender::new(signal_tx, cfg.enqueue_timeout, Arc::clone(&health), shutdown_rx.clone());

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        // Ingest consumer (sole window writer)
        let consumer = IngestConsumer::new(
            signal_rx,
            Arc::clone(&enhancer),
            WindowAggregator::new(&cfg.windows),
            Arc::clone(&store),
            Arc::clone(&health),
            Arc::clone(&latency),
            cfg.snapshot_interval,
            shutdown_rx.clone(),
        );
        let consumer_task = tokio::spawn(async move { consumer.run().await });

        // Pattern detector
        let pattern = PatternDetector::new(
            Arc::clone(&store),
            cfg.pattern.clone(),
            event_tx.clone(),
            Arc::clone(&health),
            shutdown_rx.clone(),
        );
        tasks.push(tokio::spawn(async move { pattern.run().await }));

        // Anomaly detector
        let anomaly = AnomalyDetector::new(
            Arc::clone(&store),
            cfg.anomaly.clone(),
            event_tx,
            Arc::clone(&health),
            shutdown_rx.clone(),
        );
        tasks.push(tokio::spawn(async move { anomaly.run().await }));

        // Throughput / queue statistics
        let reporter = StatsReporter::new(
            Arc::clone(&health),
            Arc::clone(&store),
            Arc::clone(&activity),
            sender.clone(),
            cfg.stats_interval,
            shutdown_rx,
        );
        tasks.push(tokio::spawn(async move { reporter.run().await }));

        health.set_running(true);
        info!(
            windows = cfg.windows.len(),
            queue_capacity = cfg.queue_capacity,
            "Pipeline started"
        );

        Ok(PipelineHandle {
            sender,
            store,
            enhancer,
            health,
            latency,
            events: Some(event_rx),
            shutdown_tx,
            consumer: consumer_task,
            tasks,
        })
    }
}

/// Owner of the running pipeline. Dropping it without [`shutdown`](Self::shutdown)
/// closes the shutdown channel, so every task exits on its next poll without
/// being awaited.
pub struct PipelineHandle {
    sender: SignalSender,
    store: Arc<SnapshotStore>,
    enhancer: Arc<SignalEnhancer>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    events: Option<mpsc::Receiver<DetectionEvent>>,
    shutdown_tx: watch::Sender<bool>,
    consumer: JoinHandle<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn enhancer(&self) -> Arc<SignalEnhancer> {
        Arc::clone(&self.enhancer)
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    pub fn latency(&self) -> Arc<LatencyStats> {
        Arc::clone(&self.latency)
    }

    /// Detection event stream. Can be taken once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DetectionEvent>> {
        self.events.take()
    }

    /// For tasks outside the pipeline that should stop with it.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Signals every task to stop and waits for them. Returns how many queued
    /// signals were discarded.
    pub async fn shutdown(self) -> u64 {
        self.health.set_running(false);
        if self.shutdown_tx.send(true).is_err() {
            warn!("No pipeline task was listening for shutdown");
        }
        let discarded = match self.consumer.await {
            Ok(n) => n,
            Err(e) => {
                warn!("Ingest consumer ended abnormally: {e}");
                0
            }
        };
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Pipeline task ended abnormally: {e}");
            }
        }
        info!(discarded, "Pipeline stopped");
        discarded
    }
}
