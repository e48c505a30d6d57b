use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{WindowSpec, RECOMPUTE_EVERY};
use crate::stats::std_dev_from_sums;
use crate::types::EnhancedSignal;

/// `at - span`, clamped to the earliest representable instant.
pub fn cutoff_before(at: DateTime<Utc>, span: chrono::Duration) -> DateTime<Utc> {
    at.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub event_count: usize,
    pub events_per_minute: f64,
    pub mean_engagement: f64,
    pub engagement_std_dev: f64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// A rolling, timestamp-ordered buffer of enhanced signals.
///
/// Engagement sums are maintained incrementally on insert and eviction and
/// rebuilt from scratch every `RECOMPUTE_EVERY` mutations to bound float drift.
#[derive(Debug)]
pub struct Window {
    id: String,
    duration: chrono::Duration,
    signals: VecDeque<Arc<EnhancedSignal>>,
    sum: f64,
    sum_sq: f64,
    mutations: u64,
}

impl Window {
    pub fn new(spec: &WindowSpec) -> Self {
        Self {
            id: spec.id.clone(),
            duration: spec.duration,
            signals: VecDeque::new(),
            sum: 0.0,
            sum_sq: 0.0,
            mutations: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    #[inline]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff_before(now, self.duration)
    }

    /// Inserts in timestamp order (arrival order among equal timestamps).
    /// Returns false without inserting when the signal is already past the cutoff.
    pub fn push(&mut self, signal: Arc<EnhancedSignal>, now: DateTime<Utc>) -> bool {
        let ts = signal.timestamp();
        if ts < self.cutoff(now) {
            return false;
        }
        let engagement = signal.engagement();
        match self.signals.back() {
            Some(last) if last.timestamp() > ts => {
                let pos = self.signals.partition_point(|s| s.timestamp() <= ts);
                self.signals.insert(pos, signal);
            }
            _ => self.signals.push_back(signal),
        }
        self.sum += engagement;
        self.sum_sq += engagement * engagement;
        self.note_mutation();
        if self.sum.is_nan() || self.sum_sq.is_nan() {
            self.recompute();
        }
        true
    }

    /// Evicts every signal with `timestamp < now - duration`. Returns the number evicted.
    pub fn trim(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut evicted = 0;
        while self.signals.front().is_some_and(|s| s.timestamp() < cutoff) {
            if let Some(old) = self.signals.pop_front() {
                let e = old.engagement();
                self.sum -= e;
                self.sum_sq -= e * e;
                evicted += 1;
                self.note_mutation();
            }
        }
        if self.signals.is_empty() {
            self.sum = 0.0;
            self.sum_sq = 0.0;
        } else if evicted > 0 && !(self.sum.is_finite() && self.sum_sq.is_finite()) {
            // an evicted extreme value leaves inf - inf behind
            self.recompute();
        }
        evicted
    }

    pub fn stats(&self) -> WindowStats {
        let n = self.signals.len();
        if n == 0 {
            return WindowStats::default();
        }
        let count = n as f64;
        let minutes = self.duration.num_milliseconds() as f64 / 60_000.0;
        WindowStats {
            event_count: n,
            events_per_minute: if minutes > 0.0 { count / minutes } else { 0.0 },
            mean_engagement: self.sum / count,
            engagement_std_dev: std_dev_from_sums(count, self.sum, self.sum_sq),
            oldest: self.signals.front().map(|s| s.timestamp()),
            newest: self.signals.back().map(|s| s.timestamp()),
        }
    }

    /// Copies the current contents. Readers never see the live deque.
    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> WindowSnapshot {
        WindowSnapshot {
            id: self.id.clone(),
            duration: self.duration,
            taken_at,
            stats: self.stats(),
            engagement_sum: self.sum,
            engagement_sum_sq: self.sum_sq,
            signals: self.signals.iter().cloned().collect(),
        }
    }

    pub fn recompute(&mut self) {
        self.sum = 0.0;
        self.sum_sq = 0.0;
        for s in &self.signals {
            let e = s.engagement();
            self.sum += e;
            self.sum_sq += e * e;
        }
    }

    fn note_mutation(&mut self) {
        self.mutations += 1;
        if self.mutations % RECOMPUTE_EVERY == 0 {
            self.recompute();
        }
    }
}

/// Immutable point-in-time copy of a window, shared with detectors and the correlator.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub id: String,
    pub duration: chrono::Duration,
    pub taken_at: DateTime<Utc>,
    pub stats: WindowStats,
    pub engagement_sum: f64,
    pub engagement_sum_sq: f64,
    /// Oldest first.
    pub signals: Vec<Arc<EnhancedSignal>>,
}

impl WindowSnapshot {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// The newest `n` signals, oldest first.
    pub fn recent(&self, n: usize) -> &[Arc<EnhancedSignal>] {
        let start = self.signals.len().saturating_sub(n);
        &self.signals[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawSignal;

    fn signal_at(ts: DateTime<Utc>, engagement: f64) -> Arc<EnhancedSignal> {
        Arc::new(EnhancedSignal::neutral(RawSignal {
            content: format!("post {engagement}"),
            source: "reddit".to_string(),
            timestamp: ts,
            engagement_score: engagement,
            credibility_weight: 0.5,
        }))
    }

    fn five_minute() -> Window {
        Window::new(&WindowSpec::parse("5m").unwrap())
    }

    #[test]
    fn push_and_stats() {
        let now = Utc::now();
        let mut w = five_minute();
        assert!(w.push(signal_at(now, 10.0), now));
        assert!(w.push(signal_at(now, 30.0), now));
        let stats = w.stats();
        assert_eq!(stats.event_count, 2);
        assert!((stats.mean_engagement - 20.0).abs() < 1e-9);
        assert!((stats.engagement_std_dev - 10.0).abs() < 1e-9);
        assert!((stats.events_per_minute - 0.4).abs() < 1e-9);
    }

    #[test]
    fn trim_evicts_old_signals() {
        let now = Utc::now();
        let mut w = five_minute();
        w.push(signal_at(now - chrono::Duration::minutes(4), 5.0), now - chrono::Duration::minutes(4));
        w.push(signal_at(now, 7.0), now);
        let later = now + chrono::Duration::minutes(2);
        assert_eq!(w.trim(later), 1);
        assert_eq!(w.len(), 1);
        assert!((w.stats().mean_engagement - 7.0).abs() < 1e-9);
        assert!(w.snapshot(later).signals.iter().all(|s| s.timestamp() >= later - chrono::Duration::minutes(5)));
    }

    #[test]
    fn too_old_signal_is_not_inserted() {
        let now = Utc::now();
        let mut w = five_minute();
        assert!(!w.push(signal_at(now - chrono::Duration::minutes(6), 1.0), now));
        assert!(w.is_empty());
    }

    #[test]
    fn late_arrival_is_ordered() {
        let now = Utc::now();
        let mut w = five_minute();
        w.push(signal_at(now, 1.0), now);
        w.push(signal_at(now - chrono::Duration::seconds(30), 2.0), now);
        w.push(signal_at(now - chrono::Duration::seconds(10), 3.0), now);
        let snap = w.snapshot(now);
        let engagements: Vec<f64> = snap.signals.iter().map(|s| s.engagement()).collect();
        assert_eq!(engagements, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn recompute_matches_incremental() {
        let now = Utc::now();
        let mut w = five_minute();
        for i in 0..50 {
            w.push(signal_at(now, i as f64 * 0.1), now);
        }
        let before = w.stats();
        w.recompute();
        let after = w.stats();
        assert!((before.mean_engagement - after.mean_engagement).abs() < 1e-9);
        assert!((before.engagement_std_dev - after.engagement_std_dev).abs() < 1e-9);
    }

    #[test]
    fn evicting_overflowing_engagement_restores_finite_sums() {
        let start = Utc::now();
        let mut w = Window::new(&WindowSpec::parse("1m").unwrap());
        w.push(signal_at(start, 1e200), start);
        assert!(w.snapshot(start).engagement_sum_sq.is_infinite());

        let later = start + chrono::Duration::seconds(120);
        for e in [10.0, 10.0, 11.0, 9.0, 10.0, 10.0, 9.0, 11.0, 10.0, 95.0] {
            w.push(signal_at(later, e), later);
        }
        assert_eq!(w.trim(later), 1);

        let snap = w.snapshot(later);
        assert_eq!(snap.len(), 10);
        assert!((snap.engagement_sum - 185.0).abs() < 1e-9);
        assert!(snap.engagement_sum_sq.is_finite());
        assert!(snap.stats.engagement_std_dev.is_finite());
    }

    #[test]
    fn cutoff_saturates_at_earliest_instant() {
        let now = Utc::now();
        assert_eq!(cutoff_before(now, chrono::Duration::days(1)), now - chrono::Duration::days(1));
        assert_eq!(
            cutoff_before(DateTime::<Utc>::MIN_UTC, chrono::Duration::days(1)),
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[test]
    fn recent_returns_tail() {
        let now = Utc::now();
        let mut w = five_minute();
        for e in [1.0, 2.0, 3.0] {
            w.push(signal_at(now, e), now);
        }
        let snap = w.snapshot(now);
        assert_eq!(snap.recent(2).len(), 2);
        assert_eq!(snap.recent(2)[0].engagement(), 2.0);
        assert_eq!(snap.recent(10).len(), 3);
    }
}
