//! Bounded memo for char-offset lookups

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Cache key: (document version, char offset, document size)
pub type CacheKey = (u64, usize, usize);

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub invalidations: u64,
}

/// Fixed-capacity memo, cleared wholesale when the size signature changes
#[derive(Debug, Clone)]
pub struct MappingCache {
    entries: FxHashMap<CacheKey, Option<usize>>,
    /// Insertion order for eviction
    order: VecDeque<CacheKey>,
    capacity: usize,
    /// Document size the current entries were computed against
    size_signature: Option<usize>,
    stats: CacheStats,
}

impl MappingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            size_signature: None,
            stats: CacheStats::default(),
        }
    }

    /// Drop every entry if the document size differs from the cached one
    pub fn check_signature(&mut self, size: usize) {
        if self.size_signature != Some(size) {
            if !self.entries.is_empty() {
                tracing::trace!(
                    old = ?self.size_signature,
                    new = size,
                    "document size changed, clearing mapping cache"
                );
                self.clear();
            }
            self.size_signature = Some(size);
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Option<usize>> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(*value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: Option<usize>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.size_signature = None;
        self.stats.invalidations += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }
}
