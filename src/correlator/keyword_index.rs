use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::types::EnhancedSignal;

/// Inverted index keyword → member signals.
///
/// Rebuilt from scratch on every correlation pass. `BTreeMap` keeps keyword
/// iteration order stable so identical input yields identical clusters.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    entries: BTreeMap<String, Vec<Arc<EnhancedSignal>>>,
}

impl KeywordIndex {
    /// `signals` must already be unique by id; each keyword a signal carries
    /// makes it a member of that keyword's group.
    pub fn build(signals: &[Arc<EnhancedSignal>]) -> Self {
        let mut entries: BTreeMap<String, Vec<Arc<EnhancedSignal>>> = BTreeMap::new();
        for signal in signals {
            let mut seen = HashSet::new();
            for keyword in &signal.semantic_keywords {
                if seen.insert(keyword.as_str()) {
                    entries.entry(keyword.clone()).or_default().push(Arc::clone(signal));
                }
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, keyword: &str) -> Option<&[Arc<EnhancedSignal>]> {
        self.entries.get(keyword).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Arc<EnhancedSignal>>)> {
        self.entries.iter()
    }
}
