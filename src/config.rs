use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Default rolling windows: id and duration spec.
pub const DEFAULT_WINDOWS: &str = "1m,5m,30m,1h,6h";

/// Bounded ingest queue capacity.
pub const QUEUE_CAPACITY: usize = 1024;

/// How long `submit` waits for queue space before rejecting.
pub const ENQUEUE_TIMEOUT_MS: u64 = 50;

/// How often the consumer publishes window snapshots for readers.
pub const SNAPSHOT_INTERVAL_MS: u64 = 250;

pub const PATTERN_INTERVAL_SECS: u64 = 2;
pub const ANOMALY_INTERVAL_SECS: u64 = 3;

/// Throughput / queue-depth log interval.
pub const STATS_INTERVAL_SECS: u64 = 10;

/// Periodic correlation + ranking cycle.
pub const CORRELATION_INTERVAL_SECS: u64 = 30;

/// Capacity of the detection event channel between detectors and the event consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Detection events kept for `GET /events/recent`.
pub const RECENT_EVENTS_CAPACITY: usize = 256;

/// Longest accepted window duration.
pub const MAX_WINDOW_DAYS: i64 = 365;

/// Window statistics are recomputed from scratch after this many incremental updates.
pub const RECOMPUTE_EVERY: u64 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub id: String,
    pub duration: chrono::Duration,
}

impl WindowSpec {
    /// Parses `90s`, `5m`, `1h`, `2d` or a bare number of seconds.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (digits, unit) = match spec.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => spec.split_at(idx),
            None => (spec, "s"),
        };
        let value: i64 = digits
            .parse()
            .map_err(|_| AppError::Config(format!("invalid window duration '{spec}'")))?;
        if value <= 0 {
            return Err(AppError::Config(format!("window duration must be positive: '{spec}'")));
        }
        let duration = match unit {
            "s" => chrono::Duration::try_seconds(value),
            "m" => chrono::Duration::try_minutes(value),
            "h" => chrono::Duration::try_hours(value),
            "d" => chrono::Duration::try_days(value),
            other => {
                return Err(AppError::Config(format!("unknown window unit '{other}' in '{spec}'")));
            }
        }
        .ok_or_else(|| AppError::Config(format!("window duration out of range: '{spec}'")))?;
        Ok(Self { id: spec.to_string(), duration })
    }
}

#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub interval: Duration,
    pub min_samples: usize,
    /// Size of the most-recent subset examined for a burst.
    pub recent: usize,
    pub burst_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub interval: Duration,
    pub min_samples: usize,
    pub recent: usize,
    pub sigma: f64,
}

#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    pub min_cluster_size: usize,
    pub min_distinct_sources: usize,
    /// Sub-intervals used to estimate a cluster's growth rate.
    pub growth_buckets: usize,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub top_n: usize,
    /// Jaccard overlap of member sets above which two clusters count as duplicates.
    pub dedupe_overlap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWeights {
    pub density: f64,
    pub indicators: f64,
    pub credibility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusinessWeights {
    pub diversity: f64,
    pub commercial: f64,
    pub pairing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceWeights {
    pub length: f64,
    pub match_strength: f64,
    pub credibility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumWeights {
    pub count: f64,
    pub engagement: f64,
    pub growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfidenceWeights {
    pub sources: f64,
    pub signal_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankWeights {
    pub momentum: f64,
    pub confidence: f64,
    pub credibility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub quality: QualityWeights,
    pub business: BusinessWeights,
    pub confidence: ConfidenceWeights,
    pub momentum: MomentumWeights,
    pub cluster_confidence: ClusterConfidenceWeights,
    pub rank: RankWeights,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality: QualityWeights { density: 0.35, indicators: 0.40, credibility: 0.25 },
            business: BusinessWeights { diversity: 0.40, commercial: 0.45, pairing: 0.15 },
            confidence: ConfidenceWeights { length: 0.30, match_strength: 0.35, credibility: 0.35 },
            momentum: MomentumWeights { count: 0.40, engagement: 0.30, growth: 0.30 },
            cluster_confidence: ClusterConfidenceWeights { sources: 0.60, signal_confidence: 0.40 },
            rank: RankWeights { momentum: 0.45, confidence: 0.35, credibility: 0.20 },
        }
    }
}

/// Enhancer-facing settings, split out so the enhancer can be built without the full runtime config.
#[derive(Debug, Clone)]
pub struct EnhancerConfig {
    pub max_keywords: usize,
    /// source id (lowercase) → credibility multiplier. Unknown sources use 1.0.
    pub source_credibility: HashMap<String, f64>,
    pub quality: QualityWeights,
    pub business: BusinessWeights,
    pub confidence: ConfidenceWeights,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            max_keywords: 8,
            source_credibility: default_source_credibility(),
            quality: weights.quality,
            business: weights.business,
            confidence: weights.confidence,
        }
    }
}

/// Starting multipliers; tune through SOURCE_CREDIBILITY.
pub fn default_source_credibility() -> HashMap<String, f64> {
    [
        ("hackernews", 1.1),
        ("producthunt", 1.05),
        ("github", 1.05),
        ("reddit", 1.0),
        ("indiehackers", 1.0),
        ("stackoverflow", 1.0),
        ("twitter", 0.85),
        ("marketplace", 0.9),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub windows: Vec<WindowSpec>,
    pub queue_capacity: usize,
    pub enqueue_timeout: Duration,
    pub snapshot_interval: Duration,
    pub stats_interval: Duration,
    pub pattern: PatternConfig,
    pub anomaly: AnomalyConfig,
    pub correlation: CorrelationConfig,
    pub ranking: RankingConfig,
    pub weights: ScoringWeights,
    pub max_keywords: usize,
    pub source_credibility: HashMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            api_port: 3000,
            windows: parse_windows(DEFAULT_WINDOWS).unwrap_or_default(),
            queue_capacity: QUEUE_CAPACITY,
            enqueue_timeout: Duration::from_millis(ENQUEUE_TIMEOUT_MS),
            snapshot_interval: Duration::from_millis(SNAPSHOT_INTERVAL_MS),
            stats_interval: Duration::from_secs(STATS_INTERVAL_SECS),
            pattern: PatternConfig {
                interval: Duration::from_secs(PATTERN_INTERVAL_SECS),
                min_samples: 5,
                recent: 10,
                burst_ratio: 2.0,
            },
            anomaly: AnomalyConfig {
                interval: Duration::from_secs(ANOMALY_INTERVAL_SECS),
                min_samples: 10,
                recent: 10,
                sigma: 3.0,
            },
            correlation: CorrelationConfig {
                min_cluster_size: 5,
                min_distinct_sources: 1,
                growth_buckets: 4,
                interval: Duration::from_secs(CORRELATION_INTERVAL_SECS),
            },
            ranking: RankingConfig { top_n: 20, dedupe_overlap: 0.8 },
            weights: ScoringWeights::default(),
            max_keywords: 8,
            source_credibility: default_source_credibility(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        cfg.log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        cfg.api_port = env_or("API_PORT", cfg.api_port)?;
        if let Ok(spec) = std::env::var("WINDOWS") {
            cfg.windows = parse_windows(&spec)?;
        }
        cfg.queue_capacity = env_or("QUEUE_CAPACITY", cfg.queue_capacity)?;
        cfg.enqueue_timeout = Duration::from_millis(env_or("ENQUEUE_TIMEOUT_MS", ENQUEUE_TIMEOUT_MS)?);
        cfg.snapshot_interval =
            Duration::from_millis(env_or("SNAPSHOT_INTERVAL_MS", SNAPSHOT_INTERVAL_MS)?);

        cfg.pattern.interval = Duration::from_secs(env_or("PATTERN_INTERVAL_SECS", PATTERN_INTERVAL_SECS)?);
        cfg.pattern.min_samples = env_or("PATTERN_MIN_SAMPLES", cfg.pattern.min_samples)?;
        cfg.pattern.recent = env_or("PATTERN_RECENT", cfg.pattern.recent)?;
        cfg.pattern.burst_ratio = env_or("BURST_RATIO", cfg.pattern.burst_ratio)?;

        cfg.anomaly.interval = Duration::from_secs(env_or("ANOMALY_INTERVAL_SECS", ANOMALY_INTERVAL_SECS)?);
        cfg.anomaly.min_samples = env_or("ANOMALY_MIN_SAMPLES", cfg.anomaly.min_samples)?;
        cfg.anomaly.recent = env_or("ANOMALY_RECENT", cfg.anomaly.recent)?;
        cfg.anomaly.sigma = env_or("ANOMALY_SIGMA", cfg.anomaly.sigma)?;

        cfg.correlation.min_cluster_size = env_or("MIN_CLUSTER_SIZE", cfg.correlation.min_cluster_size)?;
        cfg.correlation.min_distinct_sources =
            env_or("MIN_DISTINCT_SOURCES", cfg.correlation.min_distinct_sources)?;
        cfg.correlation.interval =
            Duration::from_secs(env_or("CORRELATION_INTERVAL_SECS", CORRELATION_INTERVAL_SECS)?);

        cfg.ranking.top_n = env_or("TOP_N", cfg.ranking.top_n)?;
        cfg.ranking.dedupe_overlap = env_or("DEDUPE_OVERLAP", cfg.ranking.dedupe_overlap)?;
        cfg.max_keywords = env_or("MAX_KEYWORDS", cfg.max_keywords)?;

        if let Ok(table) = std::env::var("SOURCE_CREDIBILITY") {
            for (source, multiplier) in parse_source_table(&table)? {
                cfg.source_credibility.insert(source, multiplier);
            }
        }

        if let Some([a, b, c]) = env_weights::<3>("QUALITY_WEIGHTS")? {
            cfg.weights.quality = QualityWeights { density: a, indicators: b, credibility: c };
        }
        if let Some([a, b, c]) = env_weights::<3>("BUSINESS_WEIGHTS")? {
            cfg.weights.business = BusinessWeights { diversity: a, commercial: b, pairing: c };
        }
        if let Some([a, b, c]) = env_weights::<3>("CONFIDENCE_WEIGHTS")? {
            cfg.weights.confidence = ConfidenceWeights { length: a, match_strength: b, credibility: c };
        }
        if let Some([a, b, c]) = env_weights::<3>("MOMENTUM_WEIGHTS")? {
            cfg.weights.momentum = MomentumWeights { count: a, engagement: b, growth: c };
        }
        if let Some([a, b]) = env_weights::<2>("CLUSTER_CONFIDENCE_WEIGHTS")? {
            cfg.weights.cluster_confidence = ClusterConfidenceWeights { sources: a, signal_confidence: b };
        }
        if let Some([a, b, c]) = env_weights::<3>("RANK_WEIGHTS")? {
            cfg.weights.rank = RankWeights { momentum: a, confidence: b, credibility: c };
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Startup checks. Anything rejected here is fatal; everything later degrades per signal/window.
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(AppError::Config("at least one window is required".to_string()));
        }
        let mut ids = HashSet::new();
        for w in &self.windows {
            if w.duration <= chrono::Duration::zero() {
                return Err(AppError::Config(format!("window '{}' has non-positive duration", w.id)));
            }
            if w.duration > chrono::Duration::days(MAX_WINDOW_DAYS) {
                return Err(AppError::Config(format!(
                    "window '{}' exceeds the {MAX_WINDOW_DAYS}d maximum",
                    w.id
                )));
            }
            if !ids.insert(w.id.as_str()) {
                return Err(AppError::Config(format!("duplicate window '{}'", w.id)));
            }
        }
        if self.queue_capacity == 0 {
            return Err(AppError::Config("QUEUE_CAPACITY must be > 0".to_string()));
        }
        let intervals = [
            ("SNAPSHOT_INTERVAL_MS", self.snapshot_interval),
            ("STATS_INTERVAL_SECS", self.stats_interval),
            ("PATTERN_INTERVAL_SECS", self.pattern.interval),
            ("ANOMALY_INTERVAL_SECS", self.anomaly.interval),
            ("CORRELATION_INTERVAL_SECS", self.correlation.interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(AppError::Config(format!("{name} must be > 0")));
            }
        }
        if self.pattern.min_samples == 0 || self.pattern.recent == 0 {
            return Err(AppError::Config("pattern sample sizes must be > 0".to_string()));
        }
        if self.anomaly.min_samples < 2 || self.anomaly.recent == 0 {
            return Err(AppError::Config("ANOMALY_MIN_SAMPLES must be >= 2 and ANOMALY_RECENT > 0".to_string()));
        }
        positive("BURST_RATIO", self.pattern.burst_ratio)?;
        positive("ANOMALY_SIGMA", self.anomaly.sigma)?;
        if self.correlation.min_cluster_size == 0 || self.correlation.min_distinct_sources == 0 {
            return Err(AppError::Config("cluster minimums must be > 0".to_string()));
        }
        if self.correlation.growth_buckets < 2 {
            return Err(AppError::Config("growth buckets must be >= 2".to_string()));
        }
        if self.ranking.top_n == 0 {
            return Err(AppError::Config("TOP_N must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.ranking.dedupe_overlap) || self.ranking.dedupe_overlap == 0.0 {
            return Err(AppError::Config("DEDUPE_OVERLAP must be in (0, 1]".to_string()));
        }
        if self.max_keywords == 0 {
            return Err(AppError::Config("MAX_KEYWORDS must be > 0".to_string()));
        }
        for (source, m) in &self.source_credibility {
            if !m.is_finite() || *m < 0.0 {
                return Err(AppError::Config(format!("credibility multiplier for '{source}' must be >= 0")));
            }
        }

        let w = &self.weights;
        weight_set("QUALITY_WEIGHTS", &[w.quality.density, w.quality.indicators, w.quality.credibility])?;
        weight_set("BUSINESS_WEIGHTS", &[w.business.diversity, w.business.commercial, w.business.pairing])?;
        weight_set(
            "CONFIDENCE_WEIGHTS",
            &[w.confidence.length, w.confidence.match_strength, w.confidence.credibility],
        )?;
        weight_set("MOMENTUM_WEIGHTS", &[w.momentum.count, w.momentum.engagement, w.momentum.growth])?;
        weight_set(
            "CLUSTER_CONFIDENCE_WEIGHTS",
            &[w.cluster_confidence.sources, w.cluster_confidence.signal_confidence],
        )?;
        // Source diversity must always move cluster confidence.
        positive("CLUSTER_CONFIDENCE_WEIGHTS[sources]", w.cluster_confidence.sources)?;
        weight_set("RANK_WEIGHTS", &[w.rank.momentum, w.rank.confidence, w.rank.credibility])?;
        Ok(())
    }

    pub fn enhancer(&self) -> EnhancerConfig {
        EnhancerConfig {
            max_keywords: self.max_keywords,
            source_credibility: self.source_credibility.clone(),
            quality: self.weights.quality,
            business: self.weights.business,
            confidence: self.weights.confidence,
        }
    }
}

pub fn parse_windows(spec: &str) -> Result<Vec<WindowSpec>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(WindowSpec::parse)
        .collect()
}

/// `reddit:0.8,hackernews:1.1` → [(reddit, 0.8), (hackernews, 1.1)]
pub fn parse_source_table(table: &str) -> Result<Vec<(String, f64)>> {
    table
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (source, value) = entry
                .split_once(':')
                .ok_or_else(|| AppError::Config(format!("SOURCE_CREDIBILITY entry '{entry}' must be source:multiplier")))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("invalid multiplier in '{entry}'")))?;
            Ok((source.trim().to_lowercase(), value))
        })
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has invalid value '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn env_weights<const N: usize>(key: &str) -> Result<Option<[f64; N]>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    let values: Vec<f64> = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| AppError::Config(format!("{key} must be {N} comma-separated numbers")))?;
    let arr: [f64; N] = values
        .try_into()
        .map_err(|_| AppError::Config(format!("{key} must be {N} comma-separated numbers")))?;
    Ok(Some(arr))
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::Config(format!("{name} must be a positive number")))
    }
}

fn weight_set(name: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(AppError::Config(format!("{name} must be non-negative")));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(AppError::Config(format!("{name} must not sum to zero")));
    }
    Ok(())
}
