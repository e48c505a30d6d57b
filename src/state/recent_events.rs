use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::DetectionEvent;

/// Bounded ring of the latest detection events, newest last.
pub struct RecentEvents {
    capacity: usize,
    events: Mutex<VecDeque<DetectionEvent>>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), events: Mutex::new(VecDeque::with_capacity(capacity.max(1))) }
    }

    pub fn push(&self, event: DetectionEvent) {
        if let Ok(mut events) = self.events.lock() {
            if events.len() == self.capacity {
                events.pop_front();
            }
            events.push_back(event);
        }
    }

    /// Up to `limit` events, newest first.
    pub fn latest(&self, limit: usize) -> Vec<DetectionEvent> {
        self.events
            .lock()
            .map(|events| events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
