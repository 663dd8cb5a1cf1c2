//! Re-anchoring pending suggestions by exact-text search

use crate::suggestion::{Suggestion, SuggestionId};
use crate::text::find_all;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Summary of one realignment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealignOutcome {
    /// Suggestions whose char range changed
    pub moved: Vec<SuggestionId>,
    /// Suggestions whose anchor text could not be found
    pub align_errors: Vec<SuggestionId>,
    /// Previously broken suggestions that were found again
    pub recovered: Vec<SuggestionId>,
}

/// Re-anchor pending suggestions against `text`
///
/// Suggestions are visited in list order. Each takes the occurrence of its
/// `original` nearest to its last-known start that no earlier suggestion
/// claimed. When `only` is given, the remaining pending suggestions keep
/// their ranges and count as claimed. A suggestion whose text is gone is
/// flagged `align_error` and keeps its last-known positions.
pub fn realign(
    text: &str,
    suggestions: &mut [Suggestion],
    only: Option<&FxHashSet<SuggestionId>>,
) -> RealignOutcome {
    let mut outcome = RealignOutcome::default();
    let targeted = |s: &Suggestion| s.is_pending() && only.map_or(true, |ids| ids.contains(&s.id));

    let mut claimed: FxHashSet<(usize, usize)> = suggestions
        .iter()
        .filter(|s| s.is_pending() && !targeted(s) && !s.flags.align_error)
        .map(|s| (s.char_start, s.char_end))
        .collect();
    let mut occurrences: FxHashMap<String, Vec<(usize, usize)>> = FxHashMap::default();

    for suggestion in suggestions.iter_mut().filter(|s| targeted(s)) {
        let found = occurrences
            .entry(suggestion.original.clone())
            .or_insert_with(|| find_all(text, &suggestion.original, 0));

        let hint = suggestion.char_start;
        let best = found
            .iter()
            .copied()
            .filter(|range| !claimed.contains(range))
            .min_by_key(|&(start, _)| (start.abs_diff(hint), start));

        match best {
            Some((start, end)) => {
                claimed.insert((start, end));
                if (start, end) != (suggestion.char_start, suggestion.char_end) {
                    suggestion.char_start = start;
                    suggestion.char_end = end;
                    outcome.moved.push(suggestion.id);
                }
                if suggestion.flags.align_error {
                    suggestion.flags.align_error = false;
                    outcome.recovered.push(suggestion.id);
                }
                suggestion.flags.needs_revalidation = false;
            }
            None => {
                if !suggestion.flags.align_error {
                    tracing::debug!(id = %suggestion.id, "anchor text not found");
                }
                suggestion.flags.align_error = true;
                outcome.align_errors.push(suggestion.id);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::EditType;

    fn pending(id: u64, original: &str, start: usize) -> Suggestion {
        Suggestion::new(
            SuggestionId(id),
            EditType::Copy,
            original,
            "x",
            start,
            start + original.chars().count(),
        )
    }

    #[test]
    fn test_follows_text_after_edit() {
        let mut suggestions = vec![pending(1, "fox", 16)];
        let outcome = realign("The very quick brown fox", &mut suggestions, None);
        assert_eq!(outcome.moved, vec![SuggestionId(1)]);
        assert_eq!((suggestions[0].char_start, suggestions[0].char_end), (21, 24));
    }

    #[test]
    fn test_claimed_ranges_are_skipped() {
        let text = "the cat and the dog";
        let mut suggestions = vec![pending(1, "the", 0), pending(2, "the", 0)];
        realign(text, &mut suggestions, None);
        assert_eq!(suggestions[0].char_start, 0);
        assert_eq!(suggestions[1].char_start, 12);
    }

    #[test]
    fn test_missing_text_flags_and_keeps_positions() {
        let mut suggestions = vec![pending(1, "lazy dog", 35)];
        let outcome = realign("The quick brown fox jumps over the sleepy cat.", &mut suggestions, None);
        assert_eq!(outcome.align_errors, vec![SuggestionId(1)]);
        assert!(suggestions[0].flags.align_error);
        assert_eq!((suggestions[0].char_start, suggestions[0].char_end), (35, 43));
    }

    #[test]
    fn test_idempotent() {
        let text = "a b a b a b";
        let mut suggestions = vec![pending(1, "a", 4), pending(2, "a", 4), pending(3, "b", 0)];
        realign(text, &mut suggestions, None);
        let first: Vec<_> = suggestions.iter().map(|s| (s.char_start, s.char_end)).collect();
        let outcome = realign(text, &mut suggestions, None);
        let second: Vec<_> = suggestions.iter().map(|s| (s.char_start, s.char_end)).collect();
        assert_eq!(first, second);
        assert!(outcome.moved.is_empty());
    }

    #[test]
    fn test_recovers_after_text_returns() {
        let mut suggestions = vec![pending(1, "dog", 4)];
        realign("the cat", &mut suggestions, None);
        assert!(suggestions[0].flags.align_error);
        let outcome = realign("the dog", &mut suggestions, None);
        assert_eq!(outcome.recovered, vec![SuggestionId(1)]);
        assert!(!suggestions[0].flags.align_error);
    }

    #[test]
    fn test_only_subset() {
        let text = "x x";
        let mut suggestions = vec![pending(1, "x", 0), pending(2, "x", 0)];
        let only: FxHashSet<_> = [SuggestionId(2)].into_iter().collect();
        realign(text, &mut suggestions, Some(&only));
        assert_eq!(suggestions[0].char_start, 0);
        assert_eq!(suggestions[1].char_start, 2);
    }

    #[test]
    fn test_terminal_suggestions_untouched() {
        let mut accepted = pending(1, "gone", 0);
        accepted.state = crate::suggestion::SuggestionState::Accepted;
        let mut suggestions = vec![accepted];
        let outcome = realign("nothing here", &mut suggestions, None);
        assert!(outcome.align_errors.is_empty());
        assert!(!suggestions[0].flags.align_error);
    }
}
