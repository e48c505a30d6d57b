//! Property-based tests for scoring ranges, window eviction and detector guards.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use trend_radar::config::{
    AnomalyConfig, ClusterConfidenceWeights, Config, CorrelationConfig, MomentumWeights, PatternConfig, WindowSpec,
};
use trend_radar::correlator::cluster::cluster_confidence;
use trend_radar::correlator::Correlator;
use trend_radar::detector::{detect_anomalies, detect_rapid_growth};
use trend_radar::enhancer::SignalEnhancer;
use trend_radar::state::KeywordActivity;
use trend_radar::types::{EnhancedSignal, RawSignal};
use trend_radar::window::{Window, WindowSnapshot};

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn signal(content: String, source: &str, seconds: i64, engagement: f64) -> Arc<EnhancedSignal> {
    Arc::new(EnhancedSignal::neutral(RawSignal {
        content,
        source: source.to_string(),
        timestamp: base_time() + chrono::Duration::seconds(seconds),
        engagement_score: engagement,
        credibility_weight: 0.5,
    }))
}

/// Window of `values`, one second apart, ending at `base_time() + len`.
fn snapshot_of(values: &[f64]) -> WindowSnapshot {
    let now = base_time() + chrono::Duration::seconds(values.len() as i64);
    let mut w = Window::new(&WindowSpec::parse("1h").unwrap());
    for (i, v) in values.iter().enumerate() {
        w.push(signal(format!("s{i}"), "reddit", i as i64, *v), now);
    }
    w.snapshot(now)
}

fn enhancer() -> SignalEnhancer {
    SignalEnhancer::new(
        Config::default().enhancer(),
        Arc::new(KeywordActivity::new(chrono::Duration::hours(1))),
    )
}

fn unit(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

proptest! {
    #[test]
    fn enhanced_scores_stay_in_range(
        content in "\\PC{0,200}",
        source in prop::sample::select(vec!["reddit", "hackernews", "twitter", "unknown"]),
        credibility in -2.0..3.0_f64,
        engagement in prop::num::f64::ANY,
    ) {
        let s = enhancer().enhance(RawSignal {
            content,
            source: source.to_string(),
            timestamp: base_time(),
            engagement_score: engagement,
            credibility_weight: credibility,
        });
        prop_assert!(unit(s.quality_score));
        prop_assert!(unit(s.business_potential));
        prop_assert!(unit(s.confidence_level));
        prop_assert!(unit(s.credibility_weight));
    }

    #[test]
    fn trimmed_window_holds_nothing_older_than_duration(
        offsets in prop::collection::vec(0i64..7_200, 1..60),
        advance in 0i64..7_200,
    ) {
        let mut w = Window::new(&WindowSpec::parse("30m").unwrap());
        let mut now = base_time();
        for (i, off) in offsets.iter().enumerate() {
            now = now.max(base_time() + chrono::Duration::seconds(*off));
            w.push(signal(format!("s{i}"), "reddit", *off, 1.0), now);
            w.trim(now);
        }
        let later = now + chrono::Duration::seconds(advance);
        w.trim(later);
        let cutoff = later - chrono::Duration::minutes(30);
        let snap = w.snapshot(later);
        prop_assert!(snap.signals.iter().all(|s| s.timestamp() >= cutoff));
        prop_assert!(snap.signals.windows(2).all(|p| p[0].timestamp() <= p[1].timestamp()));
        prop_assert_eq!(snap.stats.event_count, snap.signals.len());
    }

    #[test]
    fn identical_engagement_never_anomalous(value in 0.0..1_000.0_f64, len in 10usize..60) {
        let cfg = AnomalyConfig { interval: Duration::from_secs(3), min_samples: 10, recent: 10, sigma: 3.0 };
        prop_assert!(detect_anomalies(&snapshot_of(&vec![value; len]), &cfg, base_time()).is_empty());
    }

    #[test]
    fn identical_recent_subset_never_anomalous(
        head in prop::collection::vec(0.0..1_000.0_f64, 0..20),
        value in 0.0..1_000.0_f64,
    ) {
        let cfg = AnomalyConfig { interval: Duration::from_secs(3), min_samples: 10, recent: 10, sigma: 3.0 };
        let mut values = head;
        values.extend(vec![value; 10]);
        prop_assert!(detect_anomalies(&snapshot_of(&values), &cfg, base_time()).is_empty());
    }

    #[test]
    fn pattern_needs_minimum_sample(values in prop::collection::vec(0.0..10_000.0_f64, 0..5)) {
        let cfg = PatternConfig { interval: Duration::from_secs(2), min_samples: 5, recent: 10, burst_ratio: 2.0 };
        prop_assert!(detect_rapid_growth(&snapshot_of(&values), &cfg, base_time()).is_none());
    }

    #[test]
    fn more_sources_means_strictly_more_confidence(
        mean_confidence in 0.0..=1.0_f64,
        sources_weight in 0.01..1.0_f64,
        signal_weight in 0.0..1.0_f64,
    ) {
        let w = ClusterConfidenceWeights { sources: sources_weight, signal_confidence: signal_weight };
        let one = cluster_confidence(1, mean_confidence, &w);
        let three = cluster_confidence(3, mean_confidence, &w);
        prop_assert!(three > one);
        prop_assert!(unit(one) && unit(three));
    }

    #[test]
    fn cluster_metrics_stay_in_range(
        members in prop::collection::vec((0i64..3_600, 0.0..10_000.0_f64, 0usize..4), 5..40),
    ) {
        let sources = ["reddit", "hackernews", "github", "twitter"];
        let signals: Vec<Arc<EnhancedSignal>> = members
            .iter()
            .enumerate()
            .map(|(i, (secs, engagement, src))| {
                let mut s = (*signal(format!("m{i}"), sources[*src], *secs, *engagement)).clone();
                s.semantic_keywords = vec!["crm".to_string()];
                s.confidence_level = 0.5;
                s.quality_score = 0.5;
                Arc::new(s)
            })
            .collect();
        let correlator = Correlator::new(
            CorrelationConfig { min_cluster_size: 5, min_distinct_sources: 1, growth_buckets: 4, interval: Duration::from_secs(30) },
            MomentumWeights { count: 0.4, engagement: 0.3, growth: 0.3 },
            ClusterConfidenceWeights { sources: 0.6, signal_confidence: 0.4 },
        );
        let clusters = correlator.correlate(&signals);
        prop_assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        prop_assert!((0.0..=10.0).contains(&c.momentum_score));
        prop_assert!(unit(c.confidence_level));
        prop_assert!(unit(c.credibility_weighted_score));
        prop_assert!(c.size() >= 5);
        prop_assert!(!c.sources.is_empty());
    }
}
