//! Bidirectional char-offset / document-position mapping

use super::cache::{CacheStats, MappingCache};
use crate::document::{DocumentModel, Leaf};
use crate::editing::{Bias, Mapping};
use crate::suggestion::Suggestion;
use crate::text::{char_len, find_all};
use serde::Serialize;

/// How far before the hint a text search starts
const SEARCH_LOOKBEHIND: usize = 100;

/// Result of validating a char range against a document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeValidation {
    pub is_valid: bool,
    pub doc_start: Option<usize>,
    pub doc_end: Option<usize>,
    pub confidence: f64,
}

/// An occurrence of searched text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMatch {
    pub char_start: usize,
    pub char_end: usize,
    pub doc_start: usize,
    pub doc_end: usize,
}

/// Converts between plain-text char offsets and document positions
#[derive(Debug, Clone)]
pub struct PositionMapper {
    cache: MappingCache,
}

impl Default for PositionMapper {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAPPER_CACHE_SIZE)
    }
}

impl PositionMapper {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: MappingCache::new(cache_capacity),
        }
    }

    /// Map a char offset to a document position.
    ///
    /// `offset == total text length` maps to the end of the last block's
    /// content; anything beyond is `None`.
    pub fn map_character_to_doc<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &D,
        offset: usize,
    ) -> Option<usize> {
        let size = doc.content_size();
        self.cache.check_signature(size);

        let key = (doc.version(), offset, size);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let mapped = char_to_doc(doc, offset);
        self.cache.insert(key, mapped);
        mapped
    }

    /// Map a document position back to a char offset.
    ///
    /// Structural positions between blocks resolve to the start of the
    /// following block's text.
    pub fn map_doc_to_char<D: DocumentModel + ?Sized>(&self, doc: &D, pos: usize) -> Option<usize> {
        if pos > doc.content_size() + 1 {
            return None;
        }

        let mut count = 0;
        let mut result = None;
        doc.for_each_leaf(&mut |leaf| {
            match leaf {
                Leaf::Text { pos: start, text } => {
                    let len = char_len(text);
                    if pos <= start + len {
                        result = Some(count + pos.saturating_sub(start));
                        return false;
                    }
                    count += len;
                }
                Leaf::EmptyBlock { pos: start } => {
                    if pos <= start {
                        result = Some(count);
                        return false;
                    }
                }
                Leaf::BlockBreak { .. } => count += 1,
            }
            true
        });

        Some(result.unwrap_or(count))
    }

    /// Resolve many offsets with a single walk over the document
    pub fn map_batch<D: DocumentModel + ?Sized>(&self, doc: &D, offsets: &[usize]) -> Vec<Option<usize>> {
        let mut results = vec![None; offsets.len()];
        if offsets.is_empty() {
            return results;
        }

        let mut order: Vec<usize> = (0..offsets.len()).collect();
        order.sort_by_key(|&i| offsets[i]);

        let mut next = 0;
        let mut count = 0;
        doc.for_each_leaf(&mut |leaf| {
            match leaf {
                Leaf::Text { pos, text } => {
                    let len = char_len(text);
                    while next < order.len() && offsets[order[next]] <= count + len {
                        let offset = offsets[order[next]];
                        if offset >= count {
                            results[order[next]] = Some(pos + offset - count);
                        }
                        next += 1;
                    }
                    count += len;
                }
                Leaf::EmptyBlock { pos } => {
                    while next < order.len() && offsets[order[next]] == count {
                        results[order[next]] = Some(pos);
                        next += 1;
                    }
                }
                Leaf::BlockBreak { .. } => count += 1,
            }
            next < order.len()
        });

        // Whatever is left past the last leaf: only the exact end maps
        while next < order.len() {
            if offsets[order[next]] == count {
                results[order[next]] = Some(doc.text_end());
            }
            next += 1;
        }

        results
    }

    /// Map both ends of a char range and score how well the mapped span
    /// reproduces the expected length
    pub fn validate_range<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &D,
        char_start: usize,
        char_end: usize,
    ) -> RangeValidation {
        let doc_start = self.map_character_to_doc(doc, char_start);
        let doc_end = self.map_character_to_doc(doc, char_end);

        let (start, end) = match (doc_start, doc_end) {
            (Some(start), Some(end)) if start <= end => (start, end),
            _ => {
                return RangeValidation {
                    is_valid: false,
                    doc_start,
                    doc_end,
                    confidence: 0.3,
                }
            }
        };

        let expected = char_end.saturating_sub(char_start);
        let actual = char_len(&doc.text_between(start, end));
        RangeValidation {
            is_valid: true,
            doc_start,
            doc_end,
            confidence: length_confidence(expected, actual),
        }
    }

    /// Every occurrence of `search` in the flattened text, scanning from a
    /// little before `start_hint`
    pub fn find_text_positions<D: DocumentModel + ?Sized>(
        &self,
        doc: &D,
        search: &str,
        start_hint: usize,
    ) -> Vec<TextMatch> {
        let text = flatten(doc);
        let from = start_hint.saturating_sub(SEARCH_LOOKBEHIND);
        let ranges = find_all(&text, search, from);
        if ranges.is_empty() {
            return Vec::new();
        }

        let offsets: Vec<usize> = ranges.iter().flat_map(|&(s, e)| [s, e]).collect();
        let mapped = self.map_batch(doc, &offsets);

        ranges
            .iter()
            .zip(mapped.chunks(2))
            .filter_map(|(&(char_start, char_end), pair)| {
                Some(TextMatch {
                    char_start,
                    char_end,
                    doc_start: pair[0]?,
                    doc_end: pair[1]?,
                })
            })
            .collect()
    }

    /// A copy of `suggestion` with its document range mapped through a
    /// committed change. Ranges that collapse or lose an endpoint to a
    /// deletion come back unmapped. A zero-width range (the marker left by
    /// an accepted deletion) stays zero-width unless it was deleted.
    pub fn remap_through(&self, suggestion: &Suggestion, mapping: &Mapping) -> Suggestion {
        let mut remapped = suggestion.clone();
        if let Some((start, end)) = suggestion.doc_range() {
            let mapped = if start == end {
                let point = mapping.map_result(start, Bias::Left);
                (!point.deleted).then_some((point.pos, point.pos))
            } else {
                let new_start = mapping.map_result(start, Bias::Right);
                let new_end = mapping.map_result(end, Bias::Left);
                (!new_start.deleted && !new_end.deleted && new_start.pos < new_end.pos)
                    .then_some((new_start.pos, new_end.pos))
            };
            remapped.doc_start = mapped.map(|(start, _)| start);
            remapped.doc_end = mapped.map(|(_, end)| end);
        }
        remapped
    }

    /// Drop all cached lookups
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn char_to_doc<D: DocumentModel + ?Sized>(doc: &D, offset: usize) -> Option<usize> {
    let mut count = 0;
    let mut result = None;
    doc.for_each_leaf(&mut |leaf| {
        match leaf {
            Leaf::Text { pos, text } => {
                let len = char_len(text);
                if offset >= count && offset <= count + len {
                    result = Some(pos + offset - count);
                    return false;
                }
                count += len;
            }
            Leaf::EmptyBlock { pos } => {
                if offset == count {
                    result = Some(pos);
                    return false;
                }
            }
            Leaf::BlockBreak { .. } => count += 1,
        }
        true
    });

    match result {
        Some(pos) => Some(pos),
        None if offset == count => Some(doc.text_end()),
        None => None,
    }
}

/// Plain text assembled from the leaves
fn flatten<D: DocumentModel + ?Sized>(doc: &D) -> String {
    let mut text = String::new();
    doc.for_each_leaf(&mut |leaf| {
        match leaf {
            Leaf::Text { text: t, .. } => text.push_str(t),
            Leaf::EmptyBlock { .. } => {}
            Leaf::BlockBreak { .. } => text.push('\n'),
        }
        true
    });
    text
}

/// 1.0 on an exact length match, 0.8 within an 80% ratio, else 0.5
pub fn length_confidence(expected: usize, actual: usize) -> f64 {
    if expected == actual {
        return 1.0;
    }
    let (small, large) = if expected < actual {
        (expected, actual)
    } else {
        (actual, expected)
    };
    if large > 0 && small as f64 / large as f64 >= 0.8 {
        0.8
    } else {
        0.5
    }
}
