use std::sync::Arc;

use arc_swap::ArcSwap;
use deen_types::DictStats;

/// An immutable, fully parsed dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    pub lines: Vec<String>,
    pub stats: DictStats,
}

impl Dictionary {
    pub fn new(lines: Vec<String>, stats: DictStats) -> Self {
        Self { lines, stats }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Shared handle to the live dictionary.
///
/// A refresh replaces the whole dictionary at once. Readers take a snapshot
/// at the start of an operation and keep using it, so they see either the
/// complete old or the complete new data, never a mix.
#[derive(Clone)]
pub struct DictHandle {
    current: Arc<ArcSwap<Dictionary>>,
}

impl DictHandle {
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Dictionary::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<Dictionary> {
        self.current.load_full()
    }

    /// Hot-swap in a new dictionary
    pub fn replace(&self, dictionary: Dictionary) {
        self.current.store(Arc::new(dictionary));
    }

    pub fn stats(&self) -> DictStats {
        self.current.load().stats
    }
}

impl Default for DictHandle {
    fn default() -> Self {
        Self::new()
    }
}
