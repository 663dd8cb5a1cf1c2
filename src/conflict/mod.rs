//! Overlap detection and resolution between pending suggestions
//!
//! Overlaps are an expected, transient condition. [`ConflictResolver`]
//! groups mutually overlapping suggestions into connected components and
//! picks survivors by editorial priority, by merging, or by deferring the
//! decision to the user. None of these functions mutate their inputs;
//! survivors and synthetic suggestions are returned as new records.

mod cascade;

pub use cascade::{CascadeEffects, PositionUpdate};

use crate::config::{
    DEFAULT_MERGE_GAP_THRESHOLD, DEFAULT_REVALIDATION_SHIFT_THRESHOLD, DEFAULT_USER_CHOICE_SEVERITY,
};
use crate::suggestion::{Suggestion, SuggestionId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Thresholds used by resolution and cascade handling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Largest gap between members that still allows a merge
    pub merge_gap_threshold: usize,
    /// Shifts larger than this flag the shifted suggestion for revalidation
    pub revalidation_shift_threshold: usize,
    /// Groups above this severity are deferred to the user
    pub user_choice_severity: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            merge_gap_threshold: DEFAULT_MERGE_GAP_THRESHOLD,
            revalidation_shift_threshold: DEFAULT_REVALIDATION_SHIFT_THRESHOLD,
            user_choice_severity: DEFAULT_USER_CHOICE_SEVERITY,
        }
    }
}

/// How a conflict group is settled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Keep the highest-priority member
    #[default]
    Priority,
    /// Combine same-type neighbours into one suggestion
    Merge,
    /// Surface complex groups for an explicit decision
    UserChoice,
}

/// A connected set of overlapping suggestions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictGroup {
    /// Members sorted by start position
    pub members: Vec<Suggestion>,
    pub severity: f64,
}

impl ConflictGroup {
    fn new(members: Vec<Suggestion>) -> Self {
        let severity = severity(&members);
        Self { members, severity }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> Vec<SuggestionId> {
        self.members.iter().map(|s| s.id).collect()
    }
}

/// Output of [`ConflictResolver::resolve_conflicts`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Winners kept unchanged
    pub resolved: Vec<Suggestion>,
    /// Synthetic suggestions replacing their `merged_from` members
    pub merged: Vec<Suggestion>,
    /// Losers dropped by priority resolution
    pub invalidated: Vec<Suggestion>,
    /// Groups left for the user to decide
    pub user_choice_required: Vec<ConflictGroup>,
}

impl Resolution {
    /// Every suggestion that remains independently actionable
    pub fn survivors(&self) -> impl Iterator<Item = &Suggestion> {
        self.resolved.iter().chain(self.merged.iter())
    }
}

/// Summary of a detection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub groups: usize,
    /// Suggestions involved in any conflict
    pub conflicted: usize,
    pub max_severity: f64,
}

impl ConflictReport {
    pub fn from_groups(groups: &[ConflictGroup]) -> Self {
        Self {
            groups: groups.len(),
            conflicted: groups.iter().map(ConflictGroup::len).sum(),
            max_severity: groups.iter().map(|g| g.severity).fold(0.0, f64::max),
        }
    }
}

/// Stateless resolver parameterized by thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    config: ResolverConfig,
}

impl ConflictResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Group mapped suggestions into connected overlap components
    ///
    /// A chain of pairwise overlaps forms one group. Singletons are not
    /// conflicts and are not returned. Unmapped suggestions never conflict.
    pub fn detect_overlaps(&self, suggestions: &[Suggestion]) -> Vec<ConflictGroup> {
        let mut mapped: Vec<&Suggestion> = suggestions.iter().filter(|s| s.is_mapped()).collect();
        mapped.sort_by_key(|s| (s.doc_start, s.doc_end, s.id));

        let mut groups = Vec::new();
        let mut current: Vec<Suggestion> = Vec::new();
        let mut reach = 0;

        for suggestion in mapped {
            let Some((start, end)) = suggestion.doc_range() else {
                continue;
            };
            if !current.is_empty() && start >= reach {
                flush_group(&mut current, &mut groups);
            }
            reach = if current.is_empty() { end } else { reach.max(end) };
            current.push(suggestion.clone());
        }
        flush_group(&mut current, &mut groups);

        tracing::trace!(groups = groups.len(), "detected overlap groups");
        groups
    }

    /// Settle each group with the given strategy
    ///
    /// `alloc` hands out ids for merged suggestions.
    pub fn resolve_conflicts(
        &self,
        groups: &[ConflictGroup],
        strategy: Strategy,
        allow_merging: bool,
        alloc: &mut dyn FnMut() -> SuggestionId,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        for group in groups {
            match strategy {
                Strategy::Merge if allow_merging && self.can_merge(group) => {
                    resolution.merged.push(merge_group(group, alloc()));
                }
                Strategy::UserChoice if group.severity > self.config.user_choice_severity => {
                    resolution.user_choice_required.push(group.clone());
                }
                _ => resolve_by_priority(group, &mut resolution),
            }
        }

        tracing::debug!(
            ?strategy,
            resolved = resolution.resolved.len(),
            merged = resolution.merged.len(),
            invalidated = resolution.invalidated.len(),
            deferred = resolution.user_choice_required.len(),
            "resolved conflicts"
        );
        resolution
    }

    /// Same edit type everywhere and every consecutive gap within threshold
    fn can_merge(&self, group: &ConflictGroup) -> bool {
        let Some(first) = group.members.first() else {
            return false;
        };
        if group.members.iter().any(|s| s.edit_type != first.edit_type) {
            return false;
        }

        let mut reach = first.doc_end.unwrap_or(0);
        for member in &group.members[1..] {
            let start = member.doc_start.unwrap_or(0);
            if start.saturating_sub(reach) > self.config.merge_gap_threshold {
                return false;
            }
            reach = reach.max(member.doc_end.unwrap_or(0));
        }
        true
    }
}

fn flush_group(current: &mut Vec<Suggestion>, groups: &mut Vec<ConflictGroup>) {
    if current.len() > 1 {
        groups.push(ConflictGroup::new(std::mem::take(current)));
    } else {
        current.clear();
    }
}

/// Size, plus half the summed editorial priority, plus up to 5 for the
/// widest member
fn severity(members: &[Suggestion]) -> f64 {
    let priority: f64 = members.iter().map(|s| s.priority() as f64).sum();
    let widest = members.iter().map(Suggestion::span_len).max().unwrap_or(0);
    members.len() as f64 + 0.5 * priority + (widest as f64 / 100.0).min(5.0)
}

/// Priority descending, then confidence descending, then shorter span
pub fn priority_order(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.span_len().cmp(&b.span_len()))
        .then_with(|| a.doc_start.cmp(&b.doc_start))
        .then_with(|| a.id.cmp(&b.id))
}

fn resolve_by_priority(group: &ConflictGroup, resolution: &mut Resolution) {
    let mut ranked: Vec<&Suggestion> = group.members.iter().collect();
    ranked.sort_by(|a, b| priority_order(a, b));

    let mut ranked = ranked.into_iter();
    if let Some(winner) = ranked.next() {
        resolution.resolved.push(winner.clone());
    }
    resolution.invalidated.extend(ranked.cloned());
}

fn join_fields(members: &[Suggestion], field: fn(&Suggestion) -> &str) -> String {
    members
        .iter()
        .map(field)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn merge_group(group: &ConflictGroup, id: SuggestionId) -> Suggestion {
    let members = &group.members;
    let first = &members[0];
    let char_start = members.iter().map(|s| s.char_start).min().unwrap_or(first.char_start);
    let char_end = members.iter().map(|s| s.char_end).max().unwrap_or(first.char_end);
    let doc_start = members.iter().filter_map(|s| s.doc_start).min();
    let doc_end = members.iter().filter_map(|s| s.doc_end).max();
    let confidence = members.iter().map(|s| s.confidence).fold(1.0, f64::min);

    let mut merged = Suggestion::new(
        id,
        first.edit_type,
        join_fields(members, |s| s.original.as_str()),
        join_fields(members, |s| s.replacement.as_str()),
        char_start,
        char_end,
    )
    .with_why(join_fields(members, |s| s.why.as_str()))
    .with_confidence(confidence);
    merged.doc_start = doc_start;
    merged.doc_end = doc_end;
    merged.merged_from = members.iter().map(|s| s.id).collect();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::EditType;

    fn at(id: u64, edit_type: EditType, start: usize, end: usize) -> Suggestion {
        Suggestion::new(SuggestionId(id), edit_type, "orig", "repl", start, end).with_doc_range(start, end)
    }

    fn allocator() -> impl FnMut() -> SuggestionId {
        let mut next = 100;
        move || {
            next += 1;
            SuggestionId(next)
        }
    }

    #[test]
    fn test_detect_chains_into_one_group() {
        let resolver = ConflictResolver::default();
        let suggestions = vec![
            at(1, EditType::Copy, 0, 10),
            at(2, EditType::Copy, 8, 20),
            at(3, EditType::Copy, 18, 25),
            at(4, EditType::Copy, 25, 30),
            at(5, EditType::Proof, 40, 45),
        ];
        let groups = resolver.detect_overlaps(&suggestions);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].ids(), vec![SuggestionId(1), SuggestionId(2), SuggestionId(3)]);
    }

    #[test]
    fn test_severity() {
        let resolver = ConflictResolver::default();
        let groups = resolver.detect_overlaps(&[
            at(1, EditType::Developmental, 0, 250),
            at(2, EditType::Proof, 4, 9),
        ]);
        // 2 members + 0.5 * (5 + 1) + 250 / 100
        assert!((groups[0].severity - 7.5).abs() < 1e-9);

        let report = ConflictReport::from_groups(&groups);
        assert_eq!(report.groups, 1);
        assert_eq!(report.conflicted, 2);
    }

    #[test]
    fn test_priority_keeps_developmental() {
        let resolver = ConflictResolver::default();
        let groups = resolver.detect_overlaps(&[
            at(1, EditType::Proof, 4, 9),
            at(2, EditType::Developmental, 4, 9),
        ]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Priority, false, &mut allocator());
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].id, SuggestionId(2));
        assert_eq!(resolution.invalidated[0].id, SuggestionId(1));
    }

    #[test]
    fn test_priority_tie_breaks() {
        let resolver = ConflictResolver::default();
        let low = at(1, EditType::Copy, 0, 10).with_confidence(0.5);
        let high = at(2, EditType::Copy, 2, 12).with_confidence(0.9);
        let groups = resolver.detect_overlaps(&[low, high]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Priority, false, &mut allocator());
        assert_eq!(resolution.resolved[0].id, SuggestionId(2));

        let wide = at(3, EditType::Copy, 0, 20);
        let narrow = at(4, EditType::Copy, 5, 8);
        let groups = resolver.detect_overlaps(&[wide, narrow]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Priority, false, &mut allocator());
        assert_eq!(resolution.resolved[0].id, SuggestionId(4));
    }

    #[test]
    fn test_priority_survivors_never_overlap() {
        let resolver = ConflictResolver::default();
        let types = EditType::HIERARCHY;
        let suggestions: Vec<_> = (0..60u64)
            .map(|i| {
                let start = (i as usize * 7) % 97;
                at(i, types[i as usize % types.len()], start, start + 3 + (i as usize % 11))
            })
            .collect();

        let groups = resolver.detect_overlaps(&suggestions);
        let grouped: Vec<SuggestionId> = groups.iter().flat_map(|g| g.ids()).collect();
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Priority, false, &mut allocator());

        let survivors: Vec<&Suggestion> = suggestions
            .iter()
            .filter(|s| !grouped.contains(&s.id))
            .chain(resolution.survivors())
            .collect();
        for (i, a) in survivors.iter().enumerate() {
            for b in &survivors[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_merge_same_type() {
        let resolver = ConflictResolver::default();
        let mut a = at(1, EditType::Copy, 0, 10).with_confidence(0.9);
        a.original = "teh".into();
        a.replacement = "the".into();
        let mut b = at(2, EditType::Copy, 5, 15).with_confidence(0.6);
        b.original = "cat".into();
        b.replacement = "cats".into();

        let groups = resolver.detect_overlaps(&[a, b]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Merge, true, &mut allocator());
        assert_eq!(resolution.merged.len(), 1);
        let merged = &resolution.merged[0];
        assert_eq!(merged.id, SuggestionId(101));
        assert_eq!(merged.original, "teh cat");
        assert_eq!(merged.replacement, "the cats");
        assert_eq!(merged.doc_range(), Some((0, 15)));
        assert_eq!(merged.confidence, 0.6);
        assert_eq!(merged.merged_from, vec![SuggestionId(1), SuggestionId(2)]);
    }

    #[test]
    fn test_merge_falls_back_to_priority() {
        let resolver = ConflictResolver::default();
        let groups = resolver.detect_overlaps(&[
            at(1, EditType::Copy, 0, 10),
            at(2, EditType::Line, 5, 15),
        ]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Merge, true, &mut allocator());
        assert!(resolution.merged.is_empty());
        assert_eq!(resolution.resolved[0].id, SuggestionId(2));

        // Merging disabled
        let groups = resolver.detect_overlaps(&[at(3, EditType::Copy, 0, 10), at(4, EditType::Copy, 5, 15)]);
        let resolution = resolver.resolve_conflicts(&groups, Strategy::Merge, false, &mut allocator());
        assert!(resolution.merged.is_empty());
        assert_eq!(resolution.resolved.len(), 1);
    }

    #[test]
    fn test_user_choice_by_severity() {
        let resolver = ConflictResolver::default();
        let simple = resolver.detect_overlaps(&[at(1, EditType::Proof, 0, 5), at(2, EditType::Proof, 3, 8)]);
        // 2 + 0.5 * 2 + 0.05
        assert!(simple[0].severity < 5.0);
        let resolution = resolver.resolve_conflicts(&simple, Strategy::UserChoice, false, &mut allocator());
        assert!(resolution.user_choice_required.is_empty());
        assert_eq!(resolution.resolved.len(), 1);

        let complex = resolver.detect_overlaps(&[
            at(3, EditType::Developmental, 0, 50),
            at(4, EditType::Structural, 10, 30),
        ]);
        let resolution = resolver.resolve_conflicts(&complex, Strategy::UserChoice, false, &mut allocator());
        assert_eq!(resolution.user_choice_required.len(), 1);
        assert!(resolution.resolved.is_empty());
    }

    #[test]
    fn test_unmapped_never_conflict() {
        let resolver = ConflictResolver::default();
        let unmapped = Suggestion::new(SuggestionId(9), EditType::Copy, "a", "b", 0, 10);
        assert!(resolver.detect_overlaps(&[unmapped, at(1, EditType::Copy, 0, 10)]).is_empty());
    }
}
