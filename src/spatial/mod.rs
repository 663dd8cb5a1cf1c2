//! Spatial index over suggestion ranges
//!
//! Intervals live in an array sorted by start position. Mutations only mark
//! the array dirty; it is re-sorted lazily when the next query arrives.
//! Queries binary-search the first candidate and scan forward until
//! intervals start past the query end, so cost is O(log n + k).

use crate::config::DEFAULT_VIEWPORT_BUFFER;
use crate::suggestion::{ranges_overlap, EditType, Suggestion, SuggestionId};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Filters for a viewport query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportQuery {
    /// Only these edit types; empty means all
    pub edit_types: SmallVec<[EditType; 5]>,
    pub max_results: Option<usize>,
    /// Minimum editorial priority
    pub priority_threshold: Option<u8>,
}

impl ViewportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(mut self, types: &[EditType]) -> Self {
        self.edit_types = types.iter().copied().collect();
        self
    }

    pub fn limit(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn min_priority(mut self, priority: u8) -> Self {
        self.priority_threshold = Some(priority);
        self
    }

    fn type_mask(&self) -> u8 {
        self.edit_types
            .iter()
            .fold(0, |mask, t| mask | (1 << t.priority()))
    }

    fn accepts(&self, suggestion: &Suggestion) -> bool {
        if !self.edit_types.is_empty() && !self.edit_types.contains(&suggestion.edit_type) {
            return false;
        }
        match self.priority_threshold {
            Some(threshold) => suggestion.priority() >= threshold,
            None => true,
        }
    }
}

/// (start, end, type mask, max results, priority threshold)
type QueryKey = (usize, usize, u8, usize, u8);

#[derive(Debug, Clone)]
struct Interval {
    start: usize,
    end: usize,
    suggestion: Suggestion,
}

/// Sorted-array interval index
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    intervals: Vec<Interval>,
    ids: FxHashSet<SuggestionId>,
    /// Longest stored interval, bounds how far back a query must look
    max_len: usize,
    dirty: bool,
    buffer: usize,
    cache: FxHashMap<QueryKey, Vec<usize>>,
    cache_capacity: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::with_config(DEFAULT_VIEWPORT_BUFFER, 64)
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(buffer: usize, cache_capacity: usize) -> Self {
        Self {
            intervals: Vec::new(),
            ids: FxHashSet::default(),
            max_len: 0,
            dirty: false,
            buffer,
            cache: FxHashMap::default(),
            cache_capacity,
        }
    }

    /// Insert a suggestion; unmapped suggestions are not indexed.
    /// Re-adding an id replaces the previous interval.
    pub fn add(&mut self, suggestion: Suggestion) -> bool {
        let Some((start, end)) = suggestion.doc_range() else {
            return false;
        };
        if self.ids.contains(&suggestion.id) {
            self.remove(suggestion.id);
        }

        self.ids.insert(suggestion.id);
        self.max_len = self.max_len.max(end - start);
        self.intervals.push(Interval {
            start,
            end,
            suggestion,
        });
        self.dirty = true;
        self.cache.clear();
        true
    }

    pub fn batch_add(&mut self, suggestions: impl IntoIterator<Item = Suggestion>) -> usize {
        suggestions.into_iter().filter(|s| self.add(s.clone())).count()
    }

    pub fn remove(&mut self, id: SuggestionId) -> bool {
        if !self.ids.remove(&id) {
            return false;
        }
        self.intervals.retain(|interval| interval.suggestion.id != id);
        self.dirty = true;
        self.cache.clear();
        true
    }

    /// Replace the whole content
    pub fn rebuild_from<'a>(&mut self, suggestions: impl IntoIterator<Item = &'a Suggestion>) {
        self.clear();
        for suggestion in suggestions {
            self.add(suggestion.clone());
        }
        tracing::trace!(count = self.intervals.len(), "rebuilt spatial index");
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
        self.ids.clear();
        self.max_len = 0;
        self.dirty = false;
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.intervals
            .iter()
            .map(|interval| &interval.suggestion)
            .find(|s| s.id == id)
    }

    fn ensure_sorted(&mut self) {
        if self.dirty {
            self.intervals
                .sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
            self.dirty = false;
        }
    }

    /// Indices of intervals intersecting `[start, end)`; requires sorted
    fn scan(&self, start: usize, end: usize) -> Vec<usize> {
        // A zero-width query covers the single position at `start`
        let end = end.max(start + 1);
        let lower = start.saturating_sub(self.max_len);
        let first = self.intervals.partition_point(|i| i.start < lower);

        let mut found = Vec::new();
        for (idx, interval) in self.intervals.iter().enumerate().skip(first) {
            if interval.start >= end {
                break;
            }
            if ranges_overlap(interval.start, interval.end, start, end) {
                found.push(idx);
            }
        }
        found
    }

    /// Every suggestion whose interval intersects `[start, end)`
    pub fn query_overlaps(&mut self, start: usize, end: usize) -> Vec<&Suggestion> {
        self.ensure_sorted();
        self.scan(start, end)
            .into_iter()
            .map(|idx| &self.intervals[idx].suggestion)
            .collect()
    }

    /// Suggestions near the visible range `[start, end)`, ordered by render
    /// priority and capped at `max_results`
    pub fn query_viewport(&mut self, start: usize, end: usize, query: &ViewportQuery) -> Vec<&Suggestion> {
        self.ensure_sorted();

        let key: QueryKey = (
            start,
            end,
            query.type_mask(),
            query.max_results.unwrap_or(usize::MAX),
            query.priority_threshold.unwrap_or(0),
        );
        if !self.cache.contains_key(&key) {
            let hits = self.compute_viewport(start, end, query);
            if self.cache.len() >= self.cache_capacity {
                self.cache.clear();
            }
            self.cache.insert(key, hits);
        } else {
            tracing::trace!(start, end, "viewport cache hit");
        }

        match self.cache.get(&key) {
            Some(hits) => hits.iter().map(|&idx| &self.intervals[idx].suggestion).collect(),
            None => Vec::new(),
        }
    }

    fn compute_viewport(&self, start: usize, end: usize, query: &ViewportQuery) -> Vec<usize> {
        let lo = start.saturating_sub(self.buffer);
        let hi = end.saturating_add(self.buffer);

        let mut scored: Vec<(f64, usize)> = self
            .scan(lo, hi)
            .into_iter()
            .filter(|&idx| query.accepts(&self.intervals[idx].suggestion))
            .map(|idx| {
                let interval = &self.intervals[idx];
                (render_priority(interval, start, end, self.buffer), idx)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(self.intervals[a.1].start.cmp(&self.intervals[b.1].start))
        });
        if let Some(max) = query.max_results {
            scored.truncate(max);
        }
        scored.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Suggestions at or above a priority, highest first then by position
    pub fn query_by_priority(&mut self, min_priority: u8) -> Vec<&Suggestion> {
        self.ensure_sorted();
        let mut hits: Vec<&Suggestion> = self
            .intervals
            .iter()
            .map(|interval| &interval.suggestion)
            .filter(|s| s.priority() >= min_priority)
            .collect();
        hits.sort_by(|a, b| b.priority().cmp(&a.priority()));
        hits
    }
}

/// Editorial priority dominates; proximity to the viewport centre and
/// confidence refine; long spans are penalized
fn render_priority(interval: &Interval, start: usize, end: usize, buffer: usize) -> f64 {
    let suggestion = &interval.suggestion;
    let centre = (start + end) as f64 / 2.0;
    let mid = (interval.start + interval.end) as f64 / 2.0;
    let reach = ((end - start.min(end)) as f64 / 2.0 + buffer as f64).max(1.0);
    let proximity = 5.0 * (1.0 - ((mid - centre).abs() / reach).min(1.0));
    let length_penalty = ((interval.end - interval.start) as f64 / 100.0).min(5.0);

    suggestion.priority() as f64 * 10.0 + proximity + suggestion.confidence * 5.0 - length_penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: u64, edit_type: EditType, start: usize, end: usize) -> Suggestion {
        Suggestion::new(SuggestionId(id), edit_type, "x", "y", start, end).with_doc_range(start, end)
    }

    #[test]
    fn test_add_remove() {
        let mut index = SpatialIndex::new();
        assert!(index.add(suggestion(1, EditType::Copy, 10, 20)));
        assert!(!index.add(Suggestion::new(SuggestionId(2), EditType::Copy, "x", "y", 0, 1)));
        assert_eq!(index.len(), 1);

        // Re-adding replaces
        index.add(suggestion(1, EditType::Copy, 30, 40));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(SuggestionId(1)).unwrap().doc_start, Some(30));

        assert!(index.remove(SuggestionId(1)));
        assert!(!index.remove(SuggestionId(1)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_overlaps() {
        let mut index = SpatialIndex::new();
        index.batch_add(vec![
            suggestion(1, EditType::Copy, 0, 5),
            suggestion(2, EditType::Copy, 4, 9),
            suggestion(3, EditType::Copy, 9, 12),
            suggestion(4, EditType::Line, 0, 400),
            suggestion(5, EditType::Copy, 500, 510),
        ]);

        let mut ids: Vec<_> = index.query_overlaps(5, 9).iter().map(|s| s.id.0).collect();
        ids.sort();
        // The long interval starting at 0 is still found
        assert_eq!(ids, vec![2, 4]);

        let ids: Vec<_> = index.query_overlaps(505, 506).iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![5]);
        assert!(index.query_overlaps(450, 500).is_empty());
    }

    #[test]
    fn test_viewport_buffer_and_filters() {
        let mut index = SpatialIndex::with_config(100, 8);
        index.batch_add(vec![
            suggestion(1, EditType::Proof, 1000, 1005),
            suggestion(2, EditType::Developmental, 1150, 1160),
            suggestion(3, EditType::Copy, 1350, 1355),
            suggestion(4, EditType::Line, 5000, 5010),
        ]);

        let ids: Vec<_> = index
            .query_viewport(1000, 1200, &ViewportQuery::new())
            .iter()
            .map(|s| s.id.0)
            .collect();
        // Buffer reaches 1300 but not 1350; highest editorial priority first
        assert_eq!(ids, vec![2, 1]);

        let ids: Vec<_> = index
            .query_viewport(1000, 1300, &ViewportQuery::new().with_types(&[EditType::Copy]))
            .iter()
            .map(|s| s.id.0)
            .collect();
        assert_eq!(ids, vec![3]);

        let capped = index.query_viewport(900, 1400, &ViewportQuery::new().limit(1).min_priority(2));
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, SuggestionId(2));
    }

    #[test]
    fn test_viewport_cache_invalidated_on_add() {
        let mut index = SpatialIndex::with_config(0, 8);
        index.add(suggestion(1, EditType::Copy, 10, 20));
        assert_eq!(index.query_viewport(0, 100, &ViewportQuery::new()).len(), 1);
        index.add(suggestion(2, EditType::Copy, 30, 40));
        assert_eq!(index.query_viewport(0, 100, &ViewportQuery::new()).len(), 2);
    }

    #[test]
    fn test_priority_query() {
        let mut index = SpatialIndex::new();
        index.batch_add(vec![
            suggestion(1, EditType::Proof, 0, 5),
            suggestion(2, EditType::Structural, 50, 60),
            suggestion(3, EditType::Structural, 10, 20),
        ]);
        let ids: Vec<_> = index.query_by_priority(2).iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_many_intervals() {
        let mut index = SpatialIndex::new();
        index.batch_add((0..20_000u64).map(|i| {
            let start = (i as usize) * 10;
            suggestion(i, EditType::Copy, start, start + 5)
        }));
        assert_eq!(index.len(), 20_000);
        let hits = index.query_overlaps(100_000, 100_050);
        assert_eq!(hits.len(), 5);
    }
}
