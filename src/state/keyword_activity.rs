use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::EnhancedSignal;
use crate::window::cutoff_before;

/// Fewer observations than this across both halves → no trend.
const MIN_TREND_SAMPLES: usize = 3;

/// Relative change between halves that counts as rising/falling.
const TREND_TOLERANCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTrend {
    Rising,
    Flat,
    Falling,
    Unknown,
}

/// Per-keyword mention timestamps over a trailing horizon.
///
/// Written by the ingest consumer after each signal is enhanced; read by the
/// enhancer when no explicit timing marker is present.
pub struct KeywordActivity {
    horizon: chrono::Duration,
    /// Two horizons: the span `trend` compares over.
    retention: chrono::Duration,
    mentions: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl KeywordActivity {
    pub fn new(horizon: chrono::Duration) -> Self {
        let retention = horizon.checked_add(&horizon).unwrap_or(horizon);
        Self { horizon, retention, mentions: DashMap::new() }
    }

    pub fn record(&self, signal: &EnhancedSignal) {
        let ts = signal.timestamp();
        let cutoff = cutoff_before(ts, self.retention);
        for keyword in &signal.semantic_keywords {
            let mut entry = self.mentions.entry(keyword.clone()).or_default();
            let pos = entry.partition_point(|t| *t <= ts);
            entry.insert(pos, ts);
            while entry.front().is_some_and(|t| *t < cutoff) {
                entry.pop_front();
            }
        }
    }

    /// Compares mentions in `(at - horizon, at]` with the horizon before it.
    pub fn trend(&self, keyword: &str, at: DateTime<Utc>) -> VolumeTrend {
        let Some(entry) = self.mentions.get(keyword) else {
            return VolumeTrend::Unknown;
        };
        let mid = cutoff_before(at, self.horizon);
        let start = cutoff_before(mid, self.horizon);
        let mut previous = 0usize;
        let mut recent = 0usize;
        for t in entry.iter() {
            if *t > mid && *t <= at {
                recent += 1;
            } else if *t > start && *t <= mid {
                previous += 1;
            }
        }
        drop(entry);

        if previous + recent < MIN_TREND_SAMPLES {
            return VolumeTrend::Unknown;
        }
        let (prev, rec) = (previous as f64, recent as f64);
        if rec > prev * (1.0 + TREND_TOLERANCE) {
            VolumeTrend::Rising
        } else if rec < prev * (1.0 - TREND_TOLERANCE) {
            VolumeTrend::Falling
        } else {
            VolumeTrend::Flat
        }
    }

    /// Drops mentions older than `now - 2 × horizon` and forgets empty keywords.
    pub fn evict_stale(&self, now: DateTime<Utc>) -> usize {
        let cutoff = cutoff_before(now, self.retention);
        self.mentions.retain(|_, times| {
            while times.front().is_some_and(|t| *t < cutoff) {
                times.pop_front();
            }
            !times.is_empty()
        });
        self.mentions.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.mentions.len()
    }
}
