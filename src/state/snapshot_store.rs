use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::types::EnhancedSignal;
use crate::window::WindowSnapshot;

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Latest published snapshot per window.
///
/// The ingest consumer is the only writer; detectors, the correlation cycle and
/// the HTTP layer read whole `Arc<WindowSnapshot>` values and never see a window
/// mid-mutation.
pub struct SnapshotStore {
    /// window_id → latest snapshot
    snapshots: DashMap<String, Arc<WindowSnapshot>>,
    /// Window ids in configured order, for stable iteration.
    order: Vec<String>,
    /// Set once shutdown begins; no further snapshots are accepted.
    sealed: AtomicBool,
}

impl SnapshotStore {
    pub fn new(window_ids: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: DashMap::new(),
            order: window_ids,
            sealed: AtomicBool::new(false),
        })
    }

    /// Replaces the stored snapshot for the window. Ignored after [`seal`](Self::seal).
    pub fn publish(&self, snapshot: WindowSnapshot) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.snapshots.insert(snapshot.id.clone(), Arc::new(snapshot));
        true
    }

    pub fn publish_all(&self, snapshots: Vec<WindowSnapshot>) -> usize {
        snapshots.into_iter().map(|s| usize::from(self.publish(s))).sum()
    }

    pub fn get(&self, window_id: &str) -> Option<Arc<WindowSnapshot>> {
        self.snapshots.get(window_id).map(|s| Arc::clone(s.value()))
    }

    /// Every published snapshot in configured window order.
    pub fn all(&self) -> Vec<Arc<WindowSnapshot>> {
        self.order.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Union of every window's signals, one entry per signal id, ordered by
    /// timestamp then id.
    pub fn all_signals(&self) -> Vec<Arc<EnhancedSignal>> {
        let mut seen = HashSet::new();
        let mut signals: Vec<Arc<EnhancedSignal>> = Vec::new();
        for snapshot in self.all() {
            for signal in &snapshot.signals {
                if seen.insert(signal.id) {
                    signals.push(Arc::clone(signal));
                }
            }
        }
        signals.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()).then(a.id.cmp(&b.id)));
        signals
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
