use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ClusterConfidenceWeights, MomentumWeights};
use crate::enhancer::indicators::{count_phrases, normalize, NOVELTY_FRAMING, SATURATION_FRAMING};
use crate::stats::{clamp_unit, mean, saturate, weighted_unit};
use crate::types::{CompetitionDensity, EnhancedSignal, MarketTiming};

/// Cluster size at which the count factor reaches ~63%.
const COUNT_SCALE: f64 = 10.0;
/// Mean engagement at which the engagement factor reaches one half.
const ENGAGEMENT_HALF: f64 = 50.0;
/// Distinct-source count at which source support reaches ~63%.
const SOURCE_SCALE: f64 = 2.0;

/// Signals grouped under one keyword, with trend metrics computed once at build time.
#[derive(Debug, Clone, Serialize)]
pub struct TopicCluster {
    pub keyword: String,
    /// Ordered by timestamp, then id.
    #[serde(skip)]
    pub signals: Vec<Arc<EnhancedSignal>>,
    pub sources: BTreeSet<String>,
    /// 0–10.
    pub momentum_score: f64,
    pub confidence_level: f64,
    pub credibility_weighted_score: f64,
    pub market_timing: MarketTiming,
    pub competition_density: CompetitionDensity,
    pub total_engagement: f64,
    pub growth_rate: f64,
}

impl TopicCluster {
    pub fn build(
        keyword: &str,
        mut signals: Vec<Arc<EnhancedSignal>>,
        growth_buckets: usize,
        momentum_weights: &MomentumWeights,
        confidence_weights: &ClusterConfidenceWeights,
    ) -> Self {
        signals.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()).then(a.id.cmp(&b.id)));
        let sources: BTreeSet<String> = signals.iter().map(|s| s.source().trim().to_lowercase()).collect();
        let (momentum_score, growth_rate) = momentum(&signals, growth_buckets, momentum_weights);
        let mean_confidence = mean(&signals.iter().map(|s| s.confidence_level).collect::<Vec<_>>());

        Self {
            keyword: keyword.to_string(),
            confidence_level: cluster_confidence(sources.len(), mean_confidence, confidence_weights),
            credibility_weighted_score: credibility_weighted(&signals),
            market_timing: vote_timing(&signals),
            competition_density: competition_density(keyword, &signals),
            total_engagement: signals.iter().map(|s| s.engagement().max(0.0)).sum(),
            momentum_score,
            growth_rate,
            sources,
            signals,
        }
    }

    pub fn size(&self) -> usize {
        self.signals.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn member_ids(&self) -> BTreeSet<u64> {
        self.signals.iter().map(|s| s.id).collect()
    }
}

/// Momentum on a 0–10 scale plus the raw growth rate it was derived from.
///
/// Growth compares the newest of `buckets` equal sub-intervals of the
/// cluster's own time span against the mean of the earlier ones. A cluster
/// whose signals share one timestamp has no measurable growth and scores a
/// neutral growth factor.
pub fn momentum(signals: &[Arc<EnhancedSignal>], buckets: usize, weights: &MomentumWeights) -> (f64, f64) {
    if signals.is_empty() {
        return (0.0, 0.0);
    }
    let count = signals.len() as f64;
    let mean_engagement = signals.iter().map(|s| s.engagement().max(0.0)).sum::<f64>() / count;

    let growth_rate = growth_rate(signals, buckets);
    let growth_factor = match growth_rate {
        Some(rate) => 0.5 + 0.5 * rate.tanh(),
        None => 0.5,
    };

    let score = weighted_unit(&[
        (weights.count, saturate(count, COUNT_SCALE)),
        (weights.engagement, mean_engagement / (mean_engagement + ENGAGEMENT_HALF)),
        (weights.growth, growth_factor),
    ]);
    (10.0 * score, growth_rate.unwrap_or(0.0))
}

/// `signals` must be timestamp-ordered. None when the span is empty.
fn growth_rate(signals: &[Arc<EnhancedSignal>], buckets: usize) -> Option<f64> {
    let (first, last) = (signals.first()?.timestamp(), signals.last()?.timestamp());
    let span = (last - first).num_milliseconds();
    if span <= 0 || buckets < 2 {
        return None;
    }
    let mut counts = vec![0usize; buckets];
    for s in signals {
        let offset = (s.timestamp() - first).num_milliseconds() as f64 / span as f64;
        let idx = ((offset * buckets as f64).floor() as usize).min(buckets - 1);
        counts[idx] += 1;
    }
    let newest = counts[buckets - 1] as f64;
    let earlier = counts[..buckets - 1].iter().sum::<usize>() as f64 / (buckets - 1) as f64;
    Some((newest - earlier) / earlier.max(1.0))
}

/// Strictly increasing in `distinct_sources` whenever the sources weight is positive.
pub fn cluster_confidence(
    distinct_sources: usize,
    mean_signal_confidence: f64,
    weights: &ClusterConfidenceWeights,
) -> f64 {
    weighted_unit(&[
        (weights.sources, saturate(distinct_sources as f64, SOURCE_SCALE)),
        (weights.signal_confidence, clamp_unit(mean_signal_confidence)),
    ])
}

pub fn credibility_weighted(signals: &[Arc<EnhancedSignal>]) -> f64 {
    let products: Vec<f64> = signals.iter().map(|s| s.credibility_weight * s.quality_score).collect();
    clamp_unit(mean(&products))
}

/// Majority vote over members with a known timing. Ties go to the bucket with
/// the higher mean confidence, then to the earlier stage.
pub fn vote_timing(signals: &[Arc<EnhancedSignal>]) -> MarketTiming {
    let mut tally: BTreeMap<MarketTiming, (usize, f64)> = BTreeMap::new();
    for s in signals.iter().filter(|s| s.market_timing != MarketTiming::Unknown) {
        let entry = tally.entry(s.market_timing).or_default();
        entry.0 += 1;
        entry.1 += s.confidence_level;
    }

    let mut best: Option<(MarketTiming, usize, f64)> = None;
    for (timing, (votes, confidence_sum)) in tally {
        let avg = confidence_sum / votes as f64;
        let better = match best {
            None => true,
            Some((_, best_votes, best_avg)) => votes > best_votes || (votes == best_votes && avg > best_avg),
        };
        if better {
            best = Some((timing, votes, avg));
        }
    }
    best.map_or(MarketTiming::Unknown, |(timing, _, _)| timing)
}

/// Novelty framing ("alternative to", "no one has") against saturated-space
/// framing ("everyone offers", "crowded") across the keyword and member content.
pub fn competition_density(keyword: &str, signals: &[Arc<EnhancedSignal>]) -> CompetitionDensity {
    let mut novelty = 0usize;
    let mut saturation = 0usize;
    let keyword_text = normalize(&keyword.replace('-', " "));
    novelty += count_phrases(&keyword_text, NOVELTY_FRAMING);
    saturation += count_phrases(&keyword_text, SATURATION_FRAMING);
    for s in signals {
        let text = normalize(&s.raw.content);
        novelty += count_phrases(&text, NOVELTY_FRAMING);
        saturation += count_phrases(&text, SATURATION_FRAMING);
    }
    match novelty.cmp(&saturation) {
        std::cmp::Ordering::Greater => CompetitionDensity::Low,
        std::cmp::Ordering::Less => CompetitionDensity::High,
        std::cmp::Ordering::Equal => CompetitionDensity::Medium,
    }
}
