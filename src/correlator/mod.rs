//! Cross-source correlation: groups enhanced signals by shared keyword and
//! scores each group as a candidate trend.

pub mod cluster;
pub mod keyword_index;

pub use cluster::TopicCluster;
pub use keyword_index::KeywordIndex;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::{ClusterConfidenceWeights, CorrelationConfig, MomentumWeights};
use crate::types::EnhancedSignal;

pub struct Correlator {
    cfg: CorrelationConfig,
    momentum_weights: MomentumWeights,
    confidence_weights: ClusterConfidenceWeights,
}

impl Correlator {
    pub fn new(
        cfg: CorrelationConfig,
        momentum_weights: MomentumWeights,
        confidence_weights: ClusterConfidenceWeights,
    ) -> Self {
        Self { cfg, momentum_weights, confidence_weights }
    }

    /// Clusters meeting the size and source-diversity minimums, strongest first.
    ///
    /// Pure over its input: duplicate signal ids are collapsed and the output
    /// order is fully determined by the signals, never by iteration order of
    /// the caller's collection.
    pub fn correlate(&self, signals: &[Arc<EnhancedSignal>]) -> Vec<TopicCluster> {
        if signals.is_empty() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut unique: Vec<Arc<EnhancedSignal>> =
            signals.iter().filter(|s| seen.insert(s.id)).cloned().collect();
        unique.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()).then(a.id.cmp(&b.id)));

        let index = KeywordIndex::build(&unique);
        let mut clusters: Vec<TopicCluster> = index
            .iter()
            .filter(|(_, members)| members.len() >= self.cfg.min_cluster_size)
            .map(|(keyword, members)| {
                TopicCluster::build(
                    keyword,
                    members.clone(),
                    self.cfg.growth_buckets,
                    &self.momentum_weights,
                    &self.confidence_weights,
                )
            })
            .filter(|c| c.source_count() >= self.cfg.min_distinct_sources)
            .collect();

        clusters.sort_by(compare_clusters);
        debug!(
            signals = unique.len(),
            keywords = index.len(),
            clusters = clusters.len(),
            "[CORRELATOR] pass complete"
        );
        clusters
    }
}

/// Momentum desc, distinct sources desc, size desc, keyword asc.
pub fn compare_clusters(a: &TopicCluster, b: &TopicCluster) -> Ordering {
    b.momentum_score
        .total_cmp(&a.momentum_score)
        .then_with(|| b.source_count().cmp(&a.source_count()))
        .then_with(|| b.size().cmp(&a.size()))
        .then_with(|| a.keyword.cmp(&b.keyword))
}
