use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Raw signal: produced by external collectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    pub content: String,
    /// Originating platform id, e.g. "reddit" or "hackernews".
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// Platform-native popularity measure (upvotes, comments, views...).
    pub engagement_score: f64,
    /// Source trustworthiness prior in [0, 1].
    pub credibility_weight: f64,
}

impl RawSignal {
    /// Rejects signals the pipeline should skip outright rather than score.
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::MalformedSignal("empty content".to_string()));
        }
        if self.source.trim().is_empty() {
            return Err(AppError::MalformedSignal("empty source".to_string()));
        }
        Ok(())
    }

    /// Stable id over content, source and timestamp. Identical re-posts collapse to one id.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.content.hash(&mut hasher);
        self.source.hash(&mut hasher);
        self.timestamp.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
        hasher.finish()
    }
}

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTiming {
    /// "just launched", "beta": the space is forming.
    Early,
    Growing,
    /// Crowded and contested right now.
    Hot,
    Declining,
    /// Enhancement degraded; no timing evidence.
    Unknown,
}

impl std::fmt::Display for MarketTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketTiming::Early => "early",
            MarketTiming::Growing => "growing",
            MarketTiming::Hot => "hot",
            MarketTiming::Declining => "declining",
            MarketTiming::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionDensity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for CompetitionDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompetitionDensity::Low => "low",
            CompetitionDensity::Medium => "medium",
            CompetitionDensity::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalComplexity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for TechnicalComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TechnicalComplexity::Low => "low",
            TechnicalComplexity::Medium => "medium",
            TechnicalComplexity::High => "high",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Enhanced signal: created once by the enhancer, shared behind Arc afterwards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EnhancedSignal {
    pub id: u64,
    pub raw: RawSignal,
    pub quality_score: f64,
    pub business_potential: f64,
    pub confidence_level: f64,
    pub pain_point_indicators: BTreeSet<String>,
    pub solution_indicators: BTreeSet<String>,
    /// Most salient first.
    pub semantic_keywords: Vec<String>,
    pub market_timing: MarketTiming,
    /// Source-adjusted credibility in [0, 1].
    pub credibility_weight: f64,
}

impl EnhancedSignal {
    /// Neutral rendition used when enhancement fails: the signal is kept, not scored.
    pub fn neutral(raw: RawSignal) -> Self {
        Self {
            id: raw.fingerprint(),
            credibility_weight: if raw.credibility_weight.is_finite() {
                raw.credibility_weight.clamp(0.0, 1.0)
            } else {
                0.0
            },
            raw,
            quality_score: 0.0,
            business_potential: 0.0,
            confidence_level: 0.0,
            pain_point_indicators: BTreeSet::new(),
            solution_indicators: BTreeSet::new(),
            semantic_keywords: Vec::new(),
            market_timing: MarketTiming::Unknown,
        }
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.raw.timestamp
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.raw.source
    }

    /// Engagement as used by window statistics. Non-finite values count as zero.
    #[inline]
    pub fn engagement(&self) -> f64 {
        if self.raw.engagement_score.is_finite() {
            self.raw.engagement_score
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Detection events: sent over mpsc from the periodic detectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PatternEvent {
    pub window_id: String,
    pub detected_at: DateTime<Utc>,
    /// Id of the newest signal in the scanned subset.
    pub trigger_signal_id: u64,
    pub max_engagement: f64,
    pub mean_engagement: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyEvent {
    pub window_id: String,
    pub detected_at: DateTime<Utc>,
    pub signal_id: u64,
    pub signal_timestamp: DateTime<Utc>,
    pub engagement: f64,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    /// None when the baseline is flat and any deviation is infinitely many sigmas.
    pub z_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionEvent {
    RapidGrowth(PatternEvent),
    Anomaly(AnomalyEvent),
}

// ---------------------------------------------------------------------------
// Opportunity: final ranked output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub title: String,
    pub keyword: String,
    pub signal_count: usize,
    pub sources: Vec<String>,
    /// 0–10.
    pub momentum_score: f64,
    pub confidence_level: f64,
    pub credibility_weighted_score: f64,
    pub market_timing: MarketTiming,
    pub competition_density: CompetitionDensity,
    pub estimated_market_size: String,
    pub technical_complexity: TechnicalComplexity,
    /// Composite ranking score in [0, 1].
    pub opportunity_score: f64,
}
