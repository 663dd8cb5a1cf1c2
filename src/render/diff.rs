//! Decoration diff protocol for incremental updates

use super::Decoration;
use crate::suggestion::SuggestionId;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A single patch for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DecorationPatch {
    Add { decoration: Decoration },
    Update { decoration: Decoration },
    Remove { id: SuggestionId },
}

/// Patches turning the previous decoration set into the current one
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecorationDiff {
    pub version: u64,
    pub patches: Vec<DecorationPatch>,
}

impl DecorationDiff {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            patches: Vec::new(),
        }
    }

    /// Compare two decoration sets keyed by suggestion id
    ///
    /// Removals come first, then additions and updates in the order of `new`.
    pub fn compute(old: &[Decoration], new: &[Decoration], version: u64) -> Self {
        let previous: FxHashMap<SuggestionId, &Decoration> = old.iter().map(|d| (d.id, d)).collect();
        let current: FxHashMap<SuggestionId, &Decoration> = new.iter().map(|d| (d.id, d)).collect();
        let mut diff = Self::new(version);

        for decoration in old {
            if !current.contains_key(&decoration.id) {
                diff.add_patch(DecorationPatch::Remove { id: decoration.id });
            }
        }

        for decoration in new {
            match previous.get(&decoration.id) {
                None => diff.add_patch(DecorationPatch::Add {
                    decoration: decoration.clone(),
                }),
                Some(prev) if *prev != decoration => diff.add_patch(DecorationPatch::Update {
                    decoration: decoration.clone(),
                }),
                Some(_) => {}
            }
        }

        diff
    }

    pub fn add_patch(&mut self, patch: DecorationPatch) {
        self.patches.push(patch);
    }

    pub fn has_patches(&self) -> bool {
        !self.patches.is_empty()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }
}

/// Remembers the last emitted set so each frame only ships changes
#[derive(Debug, Default)]
pub struct DiffEngine {
    previous: Vec<Decoration>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_diff(&mut self, current: Vec<Decoration>, version: u64) -> DecorationDiff {
        let diff = DecorationDiff::compute(&self.previous, &current, version);
        self.previous = current;
        diff
    }

    /// Forget the previous set; the next diff adds everything
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    pub fn previous(&self) -> &[Decoration] {
        &self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DecorationKind;
    use crate::suggestion::EditType;

    fn decoration(id: u64, from: usize, to: usize) -> Decoration {
        Decoration {
            id: SuggestionId(id),
            from,
            to,
            char_start: from.saturating_sub(1),
            char_end: to.saturating_sub(1),
            edit_type: EditType::Copy,
            kind: DecorationKind::Suggestion,
            class: "suggestion suggestion-copy".into(),
            color: 0,
        }
    }

    #[test]
    fn test_add_update_remove() {
        let old = vec![decoration(1, 0, 5), decoration(2, 10, 15), decoration(3, 20, 25)];
        let new = vec![decoration(1, 0, 5), decoration(2, 11, 16), decoration(4, 30, 35)];

        let diff = DecorationDiff::compute(&old, &new, 7);
        assert_eq!(diff.version, 7);
        assert_eq!(
            diff.patches,
            vec![
                DecorationPatch::Remove { id: SuggestionId(3) },
                DecorationPatch::Update { decoration: decoration(2, 11, 16) },
                DecorationPatch::Add { decoration: decoration(4, 30, 35) },
            ]
        );
    }

    #[test]
    fn test_engine_tracks_previous() {
        let mut engine = DiffEngine::new();
        let first = engine.compute_diff(vec![decoration(1, 0, 5)], 1);
        assert_eq!(first.patch_count(), 1);

        let unchanged = engine.compute_diff(vec![decoration(1, 0, 5)], 2);
        assert!(!unchanged.has_patches());

        engine.reset();
        assert!(engine.previous().is_empty());
        assert_eq!(engine.compute_diff(vec![decoration(1, 0, 5)], 3).patch_count(), 1);
    }

    #[test]
    fn test_patch_json() {
        let patch = DecorationPatch::Remove { id: SuggestionId(9) };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["op"], "remove");
        assert_eq!(json["id"], 9);
    }
}
