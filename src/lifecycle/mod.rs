//! Authoritative suggestion list and the actions that change it
//!
//! [`SuggestionManager`] is the only writer of the document and the
//! suggestion list. Every action runs to completion in the same order:
//! mutate the document, remap every other suggestion, then re-evaluate
//! conflicts and the spatial index. Single-suggestion actions update the
//! index and the conflict groups only around the suggestions they touched;
//! loading, restoring and undo rebuild both. Accept, reject, revise and the
//! other user actions snapshot the whole state first so they can be undone.

mod realign;

pub use realign::{realign, RealignOutcome};

use crate::config::EngineConfig;
use crate::conflict::{CascadeEffects, ConflictGroup, ConflictReport, ConflictResolver, Resolution, Strategy};
use crate::document::{Document, DocumentModel};
use crate::editing::{Mapping, Step};
use crate::error::{DocumentError, IngestError};
use crate::history::{current_timestamp, HistoryStack, Snapshot};
use crate::position::{CacheStats, PositionMapper};
use crate::request::{RequestTarget, RequestTicket, RequestTracker};
use crate::session::SessionSnapshot;
use crate::spatial::{SpatialIndex, ViewportQuery};
use crate::suggestion::{
    fallback_suggestions, EditType, IngestReport, Ingestor, PhaseAction, PhaseReviewItem, RawSuggestion,
    Suggestion, SuggestionId, SuggestionState,
};
use crate::text::char_len;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// What an accept, revise or revert did to the rest of the list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub id: SuggestionId,
    /// Overlapped the committed range and lost their anchor
    pub invalidated: Vec<SuggestionId>,
    /// Number of suggestions moved by the length change
    pub shifted: usize,
    /// Large shifts that were re-verified against the document
    pub revalidated: Vec<SuggestionId>,
    /// Revalidation failures
    pub align_errors: Vec<SuggestionId>,
    /// Lower editorial levels the host may request cascade suggestions for
    pub cascade_targets: Vec<EditType>,
}

/// Membership and severity of one detected overlap group
#[derive(Debug, Clone)]
struct OverlapGroup {
    ids: Vec<SuggestionId>,
    severity: f64,
}

/// Pending suggestions that still have a place in the index and the
/// decorations; align errors stay so they can be drawn as such
fn is_indexed(suggestion: &Suggestion) -> bool {
    suggestion.is_pending() && !suggestion.flags.invalidated
}

fn id_allocator(last: &mut u64) -> impl FnMut() -> SuggestionId + '_ {
    move || {
        *last += 1;
        SuggestionId(*last)
    }
}

/// Owner of the document, the suggestion list and their history
pub struct SuggestionManager {
    document: Document,
    suggestions: Vec<Suggestion>,
    mapper: PositionMapper,
    index: SpatialIndex,
    resolver: ConflictResolver,
    history: HistoryStack,
    requests: RequestTracker,
    review_threshold: f64,
    /// Last allocated suggestion id
    last_id: u64,
    /// List position of every suggestion id
    slots: FxHashMap<SuggestionId, usize>,
    groups: Vec<OverlapGroup>,
    /// Actionable suggestions currently involved in an overlap
    conflicted: FxHashSet<SuggestionId>,
    report: ConflictReport,
}

impl Default for SuggestionManager {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SuggestionManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            document: Document::new(),
            suggestions: Vec::new(),
            mapper: PositionMapper::new(config.mapper_cache_size),
            index: SpatialIndex::with_config(config.viewport_buffer, config.index_cache_size),
            resolver: ConflictResolver::new(config.resolver()),
            history: HistoryStack::new(config.history_depth),
            requests: RequestTracker::new(),
            review_threshold: config.review_threshold,
            last_id: 0,
            slots: FxHashMap::default(),
            groups: Vec::new(),
            conflicted: FxHashSet::default(),
            report: ConflictReport::default(),
        }
    }

    // ---- state access ----

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.position(id).map(|idx| &self.suggestions[idx])
    }

    pub fn pending_count(&self) -> usize {
        self.suggestions.iter().filter(|s| s.is_pending()).count()
    }

    /// Pending suggestions that are placed, unflagged and not in conflict
    pub fn actionable(&self) -> Vec<&Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.is_actionable() && !self.conflicted.contains(&s.id))
            .collect()
    }

    pub fn conflict_report(&self) -> ConflictReport {
        self.report
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.mapper.cache_stats()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Pending suggestions near a visible document range
    pub fn query_viewport(&mut self, start: usize, end: usize, query: &ViewportQuery) -> Vec<&Suggestion> {
        self.index.query_viewport(start, end, query)
    }

    /// Pending suggestions intersecting a document range
    pub fn query_overlaps(&mut self, start: usize, end: usize) -> Vec<&Suggestion> {
        self.index.query_overlaps(start, end)
    }

    /// Indexed suggestions intersecting `[start, end)` together with the
    /// document they are placed in
    pub fn visible(&mut self, start: usize, end: usize) -> (&Document, Vec<&Suggestion>) {
        (&self.document, self.index.query_overlaps(start, end))
    }

    /// Whether an editorial phase has nothing left to decide
    pub fn is_phase_complete(&self, edit_type: EditType) -> bool {
        !self
            .suggestions
            .iter()
            .any(|s| s.is_pending() && s.edit_type == edit_type)
    }

    // ---- loading and ingestion ----

    /// Start over with a new manuscript
    pub fn load_text(&mut self, text: &str) {
        self.load_document(Document::from_text(text));
    }

    pub fn load_document(&mut self, document: Document) {
        self.document = document;
        self.suggestions.clear();
        self.history.clear();
        self.mapper.invalidate();
        self.requests.cancel(RequestTarget::Suggestions);
        self.requests.cancel(RequestTarget::Cascade);
        self.refresh();
        tracing::debug!(size = self.document.size(), "loaded document");
    }

    /// Validate and place raw records
    ///
    /// `source` is the text the records were produced from; when it differs
    /// from the current document the accepted records are realigned first.
    pub fn ingest(&mut self, raws: Vec<RawSuggestion>, source: Option<&str>) -> IngestReport {
        let current = self.document.text();
        let source_text = source.unwrap_or(current.as_str());

        let mut report = Ingestor::new(source_text).ingest(raws, &mut id_allocator(&mut self.last_id));

        if source_text != current {
            let ids: FxHashSet<SuggestionId> = report.accepted.iter().map(|s| s.id).collect();
            let mut all: Vec<Suggestion> = self.suggestions.clone();
            let base = all.len();
            all.extend(report.accepted.drain(..));
            realign(&current, &mut all, Some(&ids));
            report.accepted = all.split_off(base);
        }

        for suggestion in &mut report.accepted {
            let validation = self
                .mapper
                .validate_range(&self.document, suggestion.char_start, suggestion.char_end);
            if validation.is_valid {
                suggestion.doc_start = validation.doc_start;
                suggestion.doc_end = validation.doc_end;
            }
            suggestion.confidence = suggestion.confidence.min(validation.confidence);
            suggestion.flags.needs_review = suggestion.confidence < self.review_threshold;
        }

        let touched: FxHashSet<SuggestionId> = report.accepted.iter().map(|s| s.id).collect();
        for suggestion in &report.accepted {
            self.push(suggestion.clone());
        }
        self.refresh_touched(&touched);
        report
    }

    /// Ingest a source response body if its request is still current
    pub fn ingest_response(
        &mut self,
        ticket: &RequestTicket,
        body: &str,
        source: Option<&str>,
    ) -> Result<IngestReport, IngestError> {
        if !self.requests.complete(ticket) {
            tracing::warn!(request = ?ticket.target, generation = ticket.generation, "discarding stale response");
            return Err(IngestError::Stale(ticket.generation));
        }
        let raws = Ingestor::parse_response(body)?;
        Ok(self.ingest(raws, source))
    }

    /// Degraded pattern-based suggestions for when the source failed
    pub fn ingest_fallback(&mut self) -> IngestReport {
        let raws = fallback_suggestions(&self.document.text());
        self.ingest(raws, None)
    }

    pub fn begin_request(&mut self, target: RequestTarget) -> RequestTicket {
        self.requests.begin(target)
    }

    pub fn cancel_request(&mut self, target: RequestTarget) -> bool {
        self.requests.cancel(target)
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    // ---- user actions ----

    /// Commit a suggestion's replacement; no-op unless actionable
    pub fn accept(&mut self, id: SuggestionId) -> Option<ActionOutcome> {
        let idx = self.actionable_index(id)?;
        let text = self.suggestions[idx].replacement.clone();
        self.commit(idx, text, SuggestionState::Accepted, "accept")
    }

    /// Commit user-supplied text in place of the suggested replacement
    pub fn revise(&mut self, id: SuggestionId, text: impl Into<String>) -> Option<ActionOutcome> {
        let idx = self.actionable_index(id)?;
        self.commit(idx, text.into(), SuggestionState::Revised, "revise")
    }

    /// Decline a pending suggestion without touching the document
    pub fn reject(&mut self, id: SuggestionId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if !self.suggestions[idx].is_pending() {
            return false;
        }

        self.history
            .record(Snapshot::new("reject", &self.document, &self.suggestions));
        self.suggestions[idx].state = SuggestionState::Rejected;
        tracing::debug!(%id, "rejected suggestion");
        self.refresh_touched(&[id].into_iter().collect());
        true
    }

    /// Return a decided suggestion to pending
    ///
    /// A rejected suggestion is re-anchored in place. An accepted or revised
    /// one has its committed text swapped back for the original, provided
    /// that text is still intact at its range.
    pub fn revert(&mut self, id: SuggestionId) -> Option<ActionOutcome> {
        let idx = self.position(id)?;
        let target = self.suggestions[idx].clone();

        match target.state {
            SuggestionState::Pending => None,
            SuggestionState::Rejected => {
                self.history
                    .record(Snapshot::new("revert", &self.document, &self.suggestions));
                self.suggestions[idx].state = SuggestionState::Pending;
                let only: FxHashSet<SuggestionId> = [id].into_iter().collect();
                let text = self.document.text();
                realign(&text, &mut self.suggestions, Some(&only));
                self.sync_doc_ranges(|s| s.id == id);
                self.refresh_touched(&only);
                Some(ActionOutcome {
                    id,
                    ..ActionOutcome::default()
                })
            }
            SuggestionState::Accepted | SuggestionState::Revised => {
                let (from, to) = target.doc_range()?;
                if self.document.text_between(from, to) != target.committed_text() {
                    tracing::debug!(%id, "committed text no longer intact, cannot revert");
                    return None;
                }
                let (mut outcome, touched) = self.splice(idx, &target.original, "revert")?;
                let reverted = &mut self.suggestions[idx];
                reverted.state = SuggestionState::Pending;
                reverted.revision = None;
                outcome.id = id;
                self.refresh_touched(&touched);
                Some(outcome)
            }
        }
    }

    /// Step back to the state before the last recorded action
    pub fn undo(&mut self) -> bool {
        let current = Snapshot::new("undo", &self.document, &self.suggestions);
        match self.history.undo(current) {
            Some(previous) => {
                tracing::debug!(action = previous.label, "undo");
                self.restore_snapshot(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = Snapshot::new("redo", &self.document, &self.suggestions);
        match self.history.redo(current) {
            Some(next) => {
                self.restore_snapshot(next);
                true
            }
            None => false,
        }
    }

    /// Replace the document text after free-form typing
    ///
    /// Pending suggestions touching the edited span, and those already in
    /// alignment error, are realigned by their anchor text. The rest are
    /// carried across the change.
    pub fn edit_text(&mut self, new_text: &str) -> RealignOutcome {
        let old_text = self.document.text();
        if old_text == new_text {
            return RealignOutcome::default();
        }

        let old: Vec<char> = old_text.chars().collect();
        let new: Vec<char> = new_text.chars().collect();
        let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let old_end = old.len() - suffix;
        let inserted: String = new[prefix..new.len() - suffix].iter().collect();
        let char_delta = (new.len() - suffix) as isize - old_end as isize;

        let snapshot = Snapshot::new("edit", &self.document, &self.suggestions);
        let from = self.mapper.map_character_to_doc(&self.document, prefix);
        let to = self.mapper.map_character_to_doc(&self.document, old_end);
        let map = match (from, to) {
            (Some(from), Some(to)) => self.document.apply(&Step::replace(from, to, inserted)).ok(),
            _ => None,
        };
        let rebuilt = map.is_none();
        let mapping = match map {
            Some(map) => Mapping::from(map),
            None => {
                tracing::warn!("edit could not be expressed as a step, rebuilding document");
                self.document = Document::from_text(new_text);
                self.mapper.invalidate();
                Mapping::new()
            }
        };
        self.history.record(snapshot);

        let mut stale: FxHashSet<SuggestionId> = FxHashSet::default();
        let mut touched: FxHashSet<SuggestionId> = FxHashSet::default();
        for suggestion in &mut self.suggestions {
            let near_edit = suggestion.char_start <= old_end && suggestion.char_end >= prefix;
            let shifted = suggestion.char_start >= old_end && char_delta != 0;
            if shifted {
                shift_chars(suggestion, char_delta);
            }
            if !suggestion.is_pending() {
                *suggestion = self.mapper.remap_through(suggestion, &mapping);
            } else if rebuilt || near_edit || suggestion.flags.align_error {
                stale.insert(suggestion.id);
                touched.insert(suggestion.id);
            } else {
                let remapped = self.mapper.remap_through(suggestion, &mapping);
                if shifted || remapped.doc_range() != suggestion.doc_range() {
                    touched.insert(suggestion.id);
                }
                *suggestion = remapped;
            }
        }

        let outcome = realign(new_text, &mut self.suggestions, Some(&stale));
        self.sync_doc_ranges(|s| stale.contains(&s.id));
        tracing::debug!(
            realigned = stale.len(),
            moved = outcome.moved.len(),
            align_errors = outcome.align_errors.len(),
            "realigned after edit"
        );
        self.refresh_touched(&touched);
        outcome
    }

    /// Apply a structural edit, mapping suggestion positions through it
    ///
    /// Pending suggestions whose text was touched are re-anchored by search.
    pub fn apply_step(&mut self, step: &Step) -> Result<RealignOutcome, DocumentError> {
        let snapshot = Snapshot::new("step", &self.document, &self.suggestions);
        let mapping = Mapping::from(self.document.apply(step)?);
        self.history.record(snapshot);

        let mut stale: FxHashSet<SuggestionId> = FxHashSet::default();
        let mut touched: FxHashSet<SuggestionId> = FxHashSet::default();
        let mut remapped: Vec<Suggestion> = self
            .suggestions
            .iter()
            .map(|s| self.mapper.remap_through(s, &mapping))
            .collect();

        for (suggestion, before) in remapped.iter_mut().zip(&self.suggestions) {
            if suggestion.is_pending() && suggestion.doc_range() != before.doc_range() {
                touched.insert(suggestion.id);
            }
            let Some((start, end)) = suggestion.doc_range() else {
                if suggestion.is_pending() {
                    stale.insert(suggestion.id);
                }
                continue;
            };
            if let (Some(char_start), Some(char_end)) = (
                self.mapper.map_doc_to_char(&self.document, start),
                self.mapper.map_doc_to_char(&self.document, end),
            ) {
                suggestion.char_start = char_start;
                // Accepted deletions keep their zero-width marker
                suggestion.char_end = if start == end {
                    char_start
                } else {
                    char_end.max(char_start + 1)
                };
            }
            if suggestion.is_pending() && self.document.text_between(start, end) != suggestion.original {
                stale.insert(suggestion.id);
            }
        }
        self.suggestions = remapped;

        let mut outcome = RealignOutcome::default();
        if !stale.is_empty() {
            let text = self.document.text();
            outcome = realign(&text, &mut self.suggestions, Some(&stale));
            self.sync_doc_ranges(|s| stale.contains(&s.id));
            touched.extend(stale.iter().copied());
        }
        self.refresh_touched(&touched);
        Ok(outcome)
    }

    /// Drop every suggestion
    pub fn clear_all(&mut self) -> usize {
        if self.suggestions.is_empty() {
            return 0;
        }
        self.history
            .record(Snapshot::new("clear", &self.document, &self.suggestions));
        let removed = self.suggestions.len();
        self.suggestions.clear();
        self.refresh();
        removed
    }

    /// Remove a suggestion that can no longer be placed
    pub fn dismiss(&mut self, id: SuggestionId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let suggestion = &self.suggestions[idx];
        if !(suggestion.flags.align_error || suggestion.flags.invalidated || !suggestion.is_mapped()) {
            return false;
        }
        self.history
            .record(Snapshot::new("dismiss", &self.document, &self.suggestions));
        self.suggestions.remove(idx);
        self.refresh();
        true
    }

    /// Manually clear an alignment error and re-place the suggestion at its
    /// char range
    pub fn clear_align_error(&mut self, id: SuggestionId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if !self.suggestions[idx].flags.align_error {
            return false;
        }

        let (char_start, char_end) = {
            let s = &self.suggestions[idx];
            (s.char_start, s.char_end)
        };
        let validation = self.mapper.validate_range(&self.document, char_start, char_end);
        self.history
            .record(Snapshot::new("clear align error", &self.document, &self.suggestions));
        let review_threshold = self.review_threshold;
        let suggestion = &mut self.suggestions[idx];
        suggestion.flags.align_error = false;
        if validation.is_valid {
            suggestion.doc_start = validation.doc_start;
            suggestion.doc_end = validation.doc_end;
        } else {
            suggestion.doc_start = None;
            suggestion.doc_end = None;
        }
        suggestion.confidence = suggestion.confidence.min(validation.confidence);
        suggestion.flags.needs_review = suggestion.confidence < review_threshold;
        self.refresh_touched(&[id].into_iter().collect());
        true
    }

    /// Settle overlapping actionable suggestions
    ///
    /// Losers are flagged invalidated, merged members are replaced by the
    /// merged suggestion, and groups deferred to the user stay untouched.
    pub fn resolve_conflicts(&mut self, strategy: Strategy, allow_merging: bool) -> Resolution {
        // Only current group members can be in conflict
        let candidates: Vec<Suggestion> = self
            .conflicted
            .iter()
            .filter_map(|&id| self.get(id))
            .cloned()
            .collect();
        let groups = self.resolver.detect_overlaps(&candidates);
        let resolution = self.resolver.resolve_conflicts(
            &groups,
            strategy,
            allow_merging,
            &mut id_allocator(&mut self.last_id),
        );

        let mut touched: FxHashSet<SuggestionId> = resolution
            .invalidated
            .iter()
            .map(|s| s.id)
            .chain(resolution.merged.iter().flat_map(|m| m.merged_from.iter().copied()))
            .collect();
        for &id in &touched {
            if let Some(idx) = self.position(id) {
                self.suggestions[idx].flags.invalidated = true;
            }
        }
        for merged in &resolution.merged {
            let mut merged = merged.clone();
            merged.flags.needs_review = merged.confidence < self.review_threshold;
            touched.insert(merged.id);
            self.push(merged);
        }

        self.refresh_touched(&touched);
        resolution
    }

    /// Apply per-suggestion verdicts returned after an editorial phase
    pub fn apply_phase_review(&mut self, items: &[PhaseReviewItem]) -> usize {
        let relevant = items.iter().any(|item| {
            !matches!(item.action, PhaseAction::Keep) && self.get(item.id).is_some_and(Suggestion::is_pending)
        });
        if !relevant {
            return 0;
        }
        self.history
            .record(Snapshot::new("phase review", &self.document, &self.suggestions));

        let mut updated: FxHashSet<SuggestionId> = FxHashSet::default();
        let mut removed: FxHashSet<SuggestionId> = FxHashSet::default();
        for item in items {
            let Some(idx) = self.position(item.id) else {
                continue;
            };
            if !self.suggestions[idx].is_pending() || removed.contains(&item.id) {
                continue;
            }
            match &item.action {
                PhaseAction::Keep => {}
                PhaseAction::Update { replacement, why } => {
                    let suggestion = &mut self.suggestions[idx];
                    suggestion.replacement = replacement.clone();
                    if let Some(why) = why {
                        suggestion.why = why.clone();
                    }
                    updated.insert(item.id);
                }
                PhaseAction::Remove => {
                    removed.insert(item.id);
                }
            }
        }

        let changed = updated.union(&removed).count();
        tracing::debug!(changed, "applied phase review");
        if removed.is_empty() {
            self.refresh_touched(&updated);
        } else {
            self.suggestions.retain(|s| !removed.contains(&s.id));
            self.refresh();
        }
        changed
    }

    // ---- persistence ----

    pub fn to_session(&self) -> SessionSnapshot {
        SessionSnapshot {
            text: self.document.text(),
            suggestions: self.suggestions.clone(),
            timestamp: current_timestamp(),
        }
    }

    /// Reload a saved session; pending suggestions are realigned against the
    /// saved text and history starts empty
    pub fn restore(&mut self, session: SessionSnapshot) -> RealignOutcome {
        self.document = Document::from_text(&session.text);
        self.suggestions = session.suggestions;
        self.last_id = self
            .suggestions
            .iter()
            .flat_map(|s| s.merged_from.iter().chain(std::iter::once(&s.id)))
            .map(|id| id.0)
            .max()
            .unwrap_or(0);
        self.history.clear();
        self.mapper.invalidate();

        let outcome = realign(&session.text, &mut self.suggestions, None);
        self.sync_doc_ranges(Suggestion::is_pending);
        self.refresh();
        tracing::debug!(suggestions = self.suggestions.len(), "restored session");
        outcome
    }

    // ---- internals ----

    fn position(&self, id: SuggestionId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    fn push(&mut self, suggestion: Suggestion) {
        self.slots.insert(suggestion.id, self.suggestions.len());
        self.suggestions.push(suggestion);
    }

    fn actionable_index(&self, id: SuggestionId) -> Option<usize> {
        let idx = self.position(id)?;
        if self.suggestions[idx].is_actionable() {
            Some(idx)
        } else {
            tracing::debug!(%id, "suggestion is not actionable");
            None
        }
    }

    fn commit(
        &mut self,
        idx: usize,
        text: String,
        state: SuggestionState,
        label: &'static str,
    ) -> Option<ActionOutcome> {
        let (mut outcome, touched) = self.splice(idx, &text, label)?;
        let committed = &mut self.suggestions[idx];
        committed.state = state;
        if state == SuggestionState::Revised {
            committed.revision = Some(text);
        }
        outcome.id = committed.id;
        outcome.cascade_targets = committed.edit_type.cascade_targets().to_vec();
        tracing::debug!(
            id = %outcome.id,
            ?state,
            invalidated = outcome.invalidated.len(),
            shifted = outcome.shifted,
            "committed suggestion"
        );
        self.refresh_touched(&touched);
        Some(outcome)
    }

    /// Replace the document range of `suggestions[idx]` with `text` and
    /// carry every other suggestion across the change
    ///
    /// Also returns the ids of every pending suggestion the change moved or
    /// flagged, the target included.
    fn splice(
        &mut self,
        idx: usize,
        text: &str,
        label: &'static str,
    ) -> Option<(ActionOutcome, FxHashSet<SuggestionId>)> {
        let target = self.suggestions[idx].clone();
        let (from, to) = target.doc_range()?;

        let snapshot = Snapshot::new(label, &self.document, &self.suggestions);
        let step = Step::replace(from, to, text);
        let map = match self.document.apply(&step) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(id = %target.id, %err, "could not commit suggestion");
                return None;
            }
        };
        self.history.record(snapshot);

        // Stand-in committing `text` over the target's current range
        let mut change = target.clone();
        change.replacement = text.to_string();
        change.revision = None;
        change.state = SuggestionState::Pending;
        let effects = self.resolver.handle_cascade_effects(&change, &self.suggestions);

        // A decided suggestion's range holds its committed text, which may be empty
        let old_len = if target.is_pending() {
            target.char_end - target.char_start
        } else {
            char_len(target.committed_text())
        };
        let char_delta = char_len(text) as isize - old_len as isize;
        let mapping = Mapping::from(map);
        let mut touched: FxHashSet<SuggestionId> = effects
            .invalidated
            .iter()
            .chain(effects.position_updates.iter().map(|u| &u.id))
            .copied()
            .chain(std::iter::once(target.id))
            .collect();
        let mut next = effects.apply(&self.suggestions);
        for suggestion in &mut next {
            if suggestion.id == target.id || effects.invalidated.contains(&suggestion.id) {
                continue;
            }
            if !suggestion.is_pending() {
                *suggestion = self.mapper.remap_through(suggestion, &mapping);
            } else if suggestion.char_start >= target.char_end && char_delta != 0 {
                touched.insert(suggestion.id);
            }
            if suggestion.char_start >= target.char_end {
                shift_chars(suggestion, char_delta);
            }
        }

        let committed = &mut next[idx];
        committed.doc_start = Some(from);
        committed.doc_end = Some(from + step.inserted_size());
        committed.char_end = committed.char_start + char_len(text);
        committed.flags = Default::default();
        self.suggestions = next;

        let (revalidated, align_errors) = self.revalidate(&effects);
        let outcome = ActionOutcome {
            id: target.id,
            invalidated: effects.invalidated.clone(),
            shifted: effects.position_updates.len(),
            revalidated,
            align_errors,
            cascade_targets: Vec::new(),
        };
        Some((outcome, touched))
    }

    /// Re-verify suggestions moved further than the revalidation threshold
    fn revalidate(&mut self, effects: &CascadeEffects) -> (Vec<SuggestionId>, Vec<SuggestionId>) {
        let mut revalidated = Vec::new();
        let mut align_errors = Vec::new();

        for &id in &effects.revalidation_needed {
            let Some(idx) = self.position(id) else {
                continue;
            };
            let suggestion = &self.suggestions[idx];
            let intact = suggestion
                .doc_range()
                .map(|(start, end)| self.document.text_between(start, end) == suggestion.original)
                .unwrap_or(false);

            let relocated = if intact {
                None
            } else {
                self.mapper
                    .find_text_positions(&self.document, &suggestion.original, suggestion.char_start)
                    .into_iter()
                    .min_by_key(|m| m.char_start.abs_diff(suggestion.char_start))
            };

            let suggestion = &mut self.suggestions[idx];
            suggestion.flags.needs_revalidation = false;
            if intact {
                revalidated.push(id);
            } else if let Some(found) = relocated {
                suggestion.char_start = found.char_start;
                suggestion.char_end = found.char_end;
                suggestion.doc_start = Some(found.doc_start);
                suggestion.doc_end = Some(found.doc_end);
                revalidated.push(id);
            } else {
                suggestion.flags.align_error = true;
                align_errors.push(id);
            }
        }

        (revalidated, align_errors)
    }

    /// Recompute document ranges from char ranges in a single walk
    fn sync_doc_ranges(&mut self, select: impl Fn(&Suggestion) -> bool) {
        let targets: Vec<usize> = (0..self.suggestions.len())
            .filter(|&i| select(&self.suggestions[i]) && !self.suggestions[i].flags.align_error)
            .collect();
        if targets.is_empty() {
            return;
        }

        let offsets: Vec<usize> = targets
            .iter()
            .flat_map(|&i| [self.suggestions[i].char_start, self.suggestions[i].char_end])
            .collect();
        let mapped = self.mapper.map_batch(&self.document, &offsets);

        for (&i, pair) in targets.iter().zip(mapped.chunks(2)) {
            let suggestion = &mut self.suggestions[i];
            match (pair[0], pair[1]) {
                (Some(start), Some(end)) if start <= end => {
                    suggestion.doc_start = Some(start);
                    suggestion.doc_end = Some(end);
                }
                _ => {
                    suggestion.doc_start = None;
                    suggestion.doc_end = None;
                }
            }
        }
    }

    fn restore_snapshot(&mut self, snapshot: Snapshot) {
        self.document = snapshot.document;
        self.suggestions = snapshot.suggestions;
        self.mapper.invalidate();
        self.refresh();
    }

    /// Rebuild the id slots, the index and the conflict picture from the
    /// whole list
    fn refresh(&mut self) {
        self.slots = self
            .suggestions
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id, idx))
            .collect();
        self.index
            .rebuild_from(self.suggestions.iter().filter(|s| is_indexed(s)));

        let actionable: Vec<Suggestion> = self
            .suggestions
            .iter()
            .filter(|s| s.is_actionable())
            .cloned()
            .collect();
        let groups = self.resolver.detect_overlaps(&actionable);
        self.groups.clear();
        self.conflicted.clear();
        self.record_groups(groups);
    }

    /// Bring the index and the conflict picture up to date for the
    /// suggestions in `touched` only
    ///
    /// Conflicts are re-detected over the overlap chains reachable from the
    /// touched suggestions and from the members of the groups they left.
    /// The list layout must be unchanged apart from appended suggestions.
    fn refresh_touched(&mut self, touched: &FxHashSet<SuggestionId>) {
        if touched.is_empty() {
            return;
        }
        if touched.len() > self.suggestions.len() / 2 {
            self.refresh();
            return;
        }

        let mut seeds: Vec<(SuggestionId, (usize, usize))> = Vec::new();
        for &id in touched {
            self.index.remove(id);
            let Some(suggestion) = self.get(id).filter(|s| is_indexed(s)).cloned() else {
                continue;
            };
            seeds.extend(suggestion.doc_range().map(|range| (id, range)));
            self.index.add(suggestion);
        }

        let mut left = Vec::new();
        self.groups.retain(|group| {
            let hit = group.ids.iter().any(|id| touched.contains(id));
            if hit {
                left.extend(group.ids.iter().copied());
            }
            !hit
        });
        for id in left {
            self.conflicted.remove(&id);
            if !touched.contains(&id) {
                seeds.extend(self.get(id).and_then(Suggestion::doc_range).map(|range| (id, range)));
            }
        }

        // Grow each seed to the full chain of actionable overlaps around it
        let mut candidates: FxHashMap<SuggestionId, Suggestion> = FxHashMap::default();
        for (id, (start, end)) in seeds {
            if candidates.contains_key(&id) {
                continue;
            }
            let (mut lo, mut hi) = (start, end);
            loop {
                let hits: Vec<&Suggestion> = self
                    .index
                    .query_overlaps(lo, hi)
                    .into_iter()
                    .filter(|s| s.is_actionable())
                    .collect();
                let reach = hits
                    .iter()
                    .filter_map(|s| s.doc_range())
                    .fold((lo, hi), |(low, high), (start, end)| (low.min(start), high.max(end)));
                if reach == (lo, hi) {
                    for hit in hits {
                        candidates.entry(hit.id).or_insert_with(|| hit.clone());
                    }
                    break;
                }
                (lo, hi) = reach;
            }
        }

        // Untouched groups the chains ran into are detected again in full
        let mut absorbed = Vec::new();
        self.groups.retain(|group| {
            let hit = group.ids.iter().any(|id| candidates.contains_key(id));
            if hit {
                absorbed.extend(group.ids.iter().copied());
            }
            !hit
        });
        for id in absorbed {
            self.conflicted.remove(&id);
        }

        let members: Vec<Suggestion> = candidates.into_values().collect();
        let groups = self.resolver.detect_overlaps(&members);
        tracing::trace!(
            touched = touched.len(),
            candidates = members.len(),
            groups = groups.len(),
            "refreshed around touched suggestions"
        );
        self.record_groups(groups);
    }

    fn record_groups(&mut self, groups: Vec<ConflictGroup>) {
        for group in groups {
            let ids = group.ids();
            self.conflicted.extend(ids.iter().copied());
            self.groups.push(OverlapGroup {
                ids,
                severity: group.severity,
            });
        }
        self.report = ConflictReport {
            groups: self.groups.len(),
            conflicted: self.conflicted.len(),
            max_severity: self.groups.iter().map(|g| g.severity).fold(0.0, f64::max),
        };
    }
}

fn shift_chars(suggestion: &mut Suggestion, delta: isize) {
    suggestion.char_start = suggestion.char_start.saturating_add_signed(delta);
    suggestion.char_end = suggestion.char_end.saturating_add_signed(delta);
}
