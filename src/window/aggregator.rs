use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::WindowSpec;
use crate::types::EnhancedSignal;
use crate::window::rolling::{Window, WindowSnapshot};

/// Owns every rolling window. Exactly one task (the ingest consumer) holds
/// this value mutably; everyone else reads published snapshots.
pub struct WindowAggregator {
    windows: Vec<Window>,
}

impl WindowAggregator {
    pub fn new(specs: &[WindowSpec]) -> Self {
        Self { windows: specs.iter().map(Window::new).collect() }
    }

    /// Appends to every window, then trims each against `now`.
    /// Returns how many windows accepted the signal.
    pub fn ingest(&mut self, signal: Arc<EnhancedSignal>, now: DateTime<Utc>) -> usize {
        let mut accepted = 0;
        for window in &mut self.windows {
            if window.push(Arc::clone(&signal), now) {
                accepted += 1;
            }
            window.trim(now);
        }
        accepted
    }

    /// Time-driven eviction for quiet periods with no new signals.
    pub fn trim_all(&mut self, now: DateTime<Utc>) -> usize {
        self.windows.iter_mut().map(|w| w.trim(now)).sum()
    }

    pub fn snapshots(&self, taken_at: DateTime<Utc>) -> Vec<WindowSnapshot> {
        self.windows.iter().map(|w| w.snapshot(taken_at)).collect()
    }

    pub fn window(&self, id: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }
}
