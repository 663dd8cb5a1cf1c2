//! Effects of accepting one suggestion on its pending siblings

use super::ConflictResolver;
use crate::suggestion::{ranges_overlap, Suggestion, SuggestionId};
use crate::text::char_len;
use serde::Serialize;

/// New document range for a suggestion shifted by an accepted edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub id: SuggestionId,
    pub doc_start: usize,
    pub doc_end: usize,
    pub shift: isize,
}

/// What accepting a suggestion does to the others
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeEffects {
    /// Overlapped the accepted range; their anchor text is gone
    pub invalidated: Vec<SuggestionId>,
    pub position_updates: Vec<PositionUpdate>,
    /// Shifted by more than the revalidation threshold
    pub revalidation_needed: Vec<SuggestionId>,
}

impl CascadeEffects {
    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty() && self.position_updates.is_empty()
    }

    /// Produce updated copies of `suggestions` with these effects applied
    pub fn apply(&self, suggestions: &[Suggestion]) -> Vec<Suggestion> {
        suggestions
            .iter()
            .map(|suggestion| {
                let mut next = suggestion.clone();
                if self.invalidated.contains(&suggestion.id) {
                    next.flags.invalidated = true;
                    next.doc_start = None;
                    next.doc_end = None;
                } else if let Some(update) = self.update_for(suggestion.id) {
                    next.doc_start = Some(update.doc_start);
                    next.doc_end = Some(update.doc_end);
                    if self.revalidation_needed.contains(&suggestion.id) {
                        next.flags.needs_revalidation = true;
                    }
                }
                next
            })
            .collect()
    }

    pub fn update_for(&self, id: SuggestionId) -> Option<&PositionUpdate> {
        self.position_updates.iter().find(|u| u.id == id)
    }
}

/// Document-size change from committing `text` over `[start, end)`
///
/// Each line break in the committed text splits a block and costs one
/// extra position.
pub fn commit_delta(start: usize, end: usize, text: &str) -> isize {
    let inserted = char_len(text) + text.matches('\n').count();
    inserted as isize - end.saturating_sub(start) as isize
}

impl ConflictResolver {
    /// Invalidate suggestions overlapping the accepted range and shift
    /// everything after it by the accepted edit's length delta
    ///
    /// `accepted` carries its pre-edit document range. Suggestions ending at
    /// or before its start are untouched; unmapped or non-pending ones are
    /// ignored.
    pub fn handle_cascade_effects(&self, accepted: &Suggestion, remaining: &[Suggestion]) -> CascadeEffects {
        let mut effects = CascadeEffects::default();
        let Some((a_start, a_end)) = accepted.doc_range() else {
            return effects;
        };
        let shift = commit_delta(a_start, a_end, accepted.committed_text());
        let threshold = self.config.revalidation_shift_threshold;

        for other in remaining {
            if other.id == accepted.id || !other.is_pending() {
                continue;
            }
            let Some((start, end)) = other.doc_range() else {
                continue;
            };

            if ranges_overlap(start, end, a_start, a_end) {
                effects.invalidated.push(other.id);
            } else if start >= a_end && shift != 0 {
                effects.position_updates.push(PositionUpdate {
                    id: other.id,
                    doc_start: start.saturating_add_signed(shift),
                    doc_end: end.saturating_add_signed(shift),
                    shift,
                });
                if shift.unsigned_abs() > threshold {
                    effects.revalidation_needed.push(other.id);
                }
            }
        }

        tracing::debug!(
            accepted = %accepted.id,
            shift,
            invalidated = effects.invalidated.len(),
            shifted = effects.position_updates.len(),
            "computed cascade effects"
        );
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ResolverConfig;
    use crate::suggestion::EditType;

    fn at(id: u64, original: &str, replacement: &str, start: usize, end: usize) -> Suggestion {
        Suggestion::new(SuggestionId(id), EditType::Copy, original, replacement, start, end)
            .with_doc_range(start, end)
    }

    #[test]
    fn test_shift_by_length_delta() {
        let resolver = ConflictResolver::default();
        let accepted = at(1, "abcde", "abcdefgh", 10, 15);
        let others = vec![
            at(2, "x", "y", 20, 25),
            at(3, "x", "y", 2, 10),
            at(4, "x", "y", 12, 18),
            at(5, "x", "y", 15, 16),
        ];

        let effects = resolver.handle_cascade_effects(&accepted, &others);
        assert_eq!(effects.invalidated, vec![SuggestionId(4)]);
        assert_eq!(
            effects.update_for(SuggestionId(2)),
            Some(&PositionUpdate { id: SuggestionId(2), doc_start: 23, doc_end: 28, shift: 3 })
        );
        assert_eq!(effects.update_for(SuggestionId(5)).map(|u| u.doc_start), Some(18));
        assert!(effects.update_for(SuggestionId(3)).is_none());
        assert!(effects.revalidation_needed.is_empty());

        let applied = effects.apply(&others);
        assert_eq!(applied[0].doc_range(), Some((23, 28)));
        assert_eq!(applied[1].doc_range(), Some((2, 10)));
        assert!(applied[2].flags.invalidated);
        assert!(!applied[2].is_mapped());
    }

    #[test]
    fn test_quick_fox_scenario() {
        // "The quick brown fox jumps over the lazy dog."
        let resolver = ConflictResolver::default();
        let quick = at(1, "quick", "speedy", 4, 9);
        let fox = at(2, "fox", "cat", 16, 19);

        let effects = resolver.handle_cascade_effects(&quick, std::slice::from_ref(&fox));
        let update = effects.update_for(fox.id).unwrap();
        assert_eq!((update.doc_start, update.doc_end), (17, 20));
    }

    #[test]
    fn test_large_shift_needs_revalidation() {
        let resolver = ConflictResolver::new(ResolverConfig {
            revalidation_shift_threshold: 10,
            ..ResolverConfig::default()
        });
        let accepted = at(1, "a", "a much longer replacement", 0, 1);
        let later = at(2, "x", "y", 40, 41);
        let effects = resolver.handle_cascade_effects(&accepted, std::slice::from_ref(&later));
        assert_eq!(effects.revalidation_needed, vec![SuggestionId(2)]);
        assert!(effects.apply(&[later])[0].flags.needs_revalidation);
    }

    #[test]
    fn test_revision_drives_delta() {
        let resolver = ConflictResolver::default();
        let mut accepted = at(1, "cat", "cats", 0, 3);
        accepted.revision = Some("c".into());
        let later = at(2, "x", "y", 5, 6);
        let effects = resolver.handle_cascade_effects(&accepted, &[later]);
        assert_eq!(effects.position_updates[0].shift, -2);
    }

    #[test]
    fn test_skips_non_pending_and_unmapped() {
        let resolver = ConflictResolver::default();
        let accepted = at(1, "ab", "abc", 0, 2);
        let mut rejected = at(2, "x", "y", 1, 3);
        rejected.state = crate::suggestion::SuggestionState::Rejected;
        let unmapped = Suggestion::new(SuggestionId(3), EditType::Copy, "x", "y", 0, 1);
        let effects = resolver.handle_cascade_effects(&accepted, &[rejected, unmapped]);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_commit_delta_counts_breaks() {
        assert_eq!(commit_delta(0, 3, "abc"), 0);
        assert_eq!(commit_delta(0, 3, "a\nb"), 1);
        assert_eq!(commit_delta(5, 5, "x"), 1);
    }
}
