pub mod classify;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{RankWeights, RankingConfig};
use crate::correlator::TopicCluster;
use crate::stats::weighted_unit;
use crate::types::Opportunity;

use self::classify::{estimated_market_size, normalize_keyword, technical_complexity, title_for};

/// Turns correlated clusters into the final ordered opportunity list.
pub struct OpportunityRanker {
    cfg: RankingConfig,
    weights: RankWeights,
}

struct Candidate<'a> {
    cluster: &'a TopicCluster,
    normalized: String,
    members: BTreeSet<u64>,
    score: f64,
}

impl OpportunityRanker {
    pub fn new(cfg: RankingConfig, weights: RankWeights) -> Self {
        Self { cfg, weights }
    }

    /// Composite in [0, 1]: momentum (rescaled from 0–10), confidence and
    /// credibility-weighted score under the configured weights.
    pub fn composite(&self, cluster: &TopicCluster) -> f64 {
        weighted_unit(&[
            (self.weights.momentum, cluster.momentum_score / 10.0),
            (self.weights.confidence, cluster.confidence_level),
            (self.weights.credibility, cluster.credibility_weighted_score),
        ])
    }

    /// Deduplicates, scores and returns at most `top_n` opportunities, best first.
    pub fn rank(&self, clusters: &[TopicCluster]) -> Vec<Opportunity> {
        let mut candidates: Vec<Candidate<'_>> = clusters
            .iter()
            .map(|cluster| Candidate {
                cluster,
                normalized: normalize_keyword(&cluster.keyword),
                members: cluster.member_ids(),
                score: self.composite(cluster),
            })
            .collect();
        candidates.sort_by(survivor_order);

        // Greedy: a candidate survives unless a better one already kept duplicates it.
        let mut kept: Vec<Candidate<'_>> = Vec::new();
        for candidate in candidates {
            let duplicate = kept.iter().any(|k| {
                k.normalized == candidate.normalized
                    || jaccard(&k.members, &candidate.members) >= self.cfg.dedupe_overlap
            });
            if duplicate {
                debug!(keyword = %candidate.cluster.keyword, "[RANKER] dropped near-duplicate cluster");
                continue;
            }
            kept.push(candidate);
        }
        kept.sort_by(output_order);

        kept.into_iter()
            .take(self.cfg.top_n)
            .map(|c| to_opportunity(c.cluster, c.score))
            .collect()
    }
}

/// Dedupe pass order: among equal composites the most specific keyword is
/// kept, so it wins its duplicate group.
fn survivor_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| specificity(&b.cluster.keyword).cmp(&specificity(&a.cluster.keyword)))
        .then_with(|| crate::correlator::compare_clusters(a.cluster, b.cluster))
}

/// Output order: composite desc, then the correlator's own order.
fn output_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| crate::correlator::compare_clusters(a.cluster, b.cluster))
}

/// More `-` segments, then longer. Larger is more specific.
fn specificity(keyword: &str) -> (usize, usize) {
    (keyword.split('-').filter(|s| !s.is_empty()).count(), keyword.chars().count())
}

fn jaccard(a: &BTreeSet<u64>, b: &BTreeSet<u64>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn to_opportunity(cluster: &TopicCluster, score: f64) -> Opportunity {
    Opportunity {
        title: title_for(&cluster.keyword),
        keyword: cluster.keyword.clone(),
        signal_count: cluster.size(),
        sources: cluster.sources.iter().cloned().collect(),
        momentum_score: cluster.momentum_score,
        confidence_level: cluster.confidence_level,
        credibility_weighted_score: cluster.credibility_weighted_score,
        market_timing: cluster.market_timing,
        competition_density: cluster.competition_density,
        estimated_market_size: estimated_market_size(cluster.total_engagement, cluster.source_count()),
        technical_complexity: technical_complexity(&cluster.keyword),
        opportunity_score: score,
    }
}
