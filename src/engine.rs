use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use crate::config::Config;
use crate::correlator::{Correlator, TopicCluster};
use crate::ranker::OpportunityRanker;
use crate::state::SnapshotStore;
use crate::types::{EnhancedSignal, Opportunity};

/// Correlation and ranking over the current window snapshots.
///
/// Constructed explicitly and shared behind `Arc`; every call reads one
/// consistent set of published snapshots.
pub struct OpportunityEngine {
    store: Arc<SnapshotStore>,
    correlator: Correlator,
    ranker: OpportunityRanker,
    /// Output of the last periodic cycle.
    latest: RwLock<Vec<Opportunity>>,
}

impl OpportunityEngine {
    pub fn new(store: Arc<SnapshotStore>, correlator: Correlator, ranker: OpportunityRanker) -> Arc<Self> {
        Arc::new(Self { store, correlator, ranker, latest: RwLock::new(Vec::new()) })
    }

    pub fn from_config(cfg: &Config, store: Arc<SnapshotStore>) -> Arc<Self> {
        let correlator = Correlator::new(cfg.correlation.clone(), cfg.weights.momentum, cfg.weights.cluster_confidence);
        let ranker = OpportunityRanker::new(cfg.ranking.clone(), cfg.weights.rank);
        Self::new(store, correlator, ranker)
    }

    /// Correlate then rank an explicit signal set.
    pub fn detect_from(&self, signals: &[Arc<EnhancedSignal>]) -> Vec<Opportunity> {
        let clusters: Vec<TopicCluster> = self.correlator.correlate(signals);
        self.ranker.rank(&clusters)
    }

    /// On-demand pass over every signal currently held by any window.
    pub fn detect(&self) -> Vec<Opportunity> {
        self.detect_from(&self.store.all_signals())
    }

    pub async fn latest(&self) -> Vec<Opportunity> {
        self.latest.read().await.clone()
    }

    pub async fn refresh(&self) -> usize {
        let opportunities = self.detect();
        let n = opportunities.len();
        *self.latest.write().await = opportunities;
        n
    }

    /// Periodic correlation cycle. Exits at the next tick after shutdown is signalled.
    pub async fn run(self: Arc<Self>, period: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let engine = Arc::clone(&self);
                    // CPU-bound
                    match tokio::task::spawn_blocking(move || engine.detect()).await {
                        Ok(opportunities) => {
                            if let Some(top) = opportunities.first() {
                                info!(
                                    count = opportunities.len(),
                                    top = %top.keyword,
                                    score = top.opportunity_score,
                                    "[ENGINE] correlation cycle"
                                );
                            }
                            *self.latest.write().await = opportunities;
                        }
                        Err(e) => error!("Correlation cycle failed: {e}"),
                    }
                }
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("[ENGINE] correlation cycle stopped");
    }
}
