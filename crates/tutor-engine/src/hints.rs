use std::collections::HashMap;

use parking_lot::Mutex;
use tutor_core::HintLevel;

/// Per-query hint progression, held in memory only.
///
/// The key is the literal query text: no case or whitespace normalization,
/// so two phrasings of the same question progress independently.
#[derive(Debug, Default)]
pub struct HintTracker {
    levels: Mutex<HashMap<String, HintLevel>>,
}

impl HintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `key` one level up (clamped at the ceiling) and return the new level.
    /// Read and write happen under one lock, so concurrent callers on the
    /// same key each observe a distinct step.
    pub fn advance(&self, key: &str) -> HintLevel {
        let mut levels = self.levels.lock();
        let next = HintLevel::after(levels.get(key).copied());
        levels.insert(key.to_string(), next);
        next
    }

    pub fn level(&self, key: &str) -> Option<HintLevel> {
        self.levels.lock().get(key).copied()
    }

    pub fn reset(&self, key: &str) {
        self.levels.lock().remove(key);
    }

    pub fn reset_all(&self) {
        self.levels.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.levels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
