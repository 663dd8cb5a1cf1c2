//! Manuscript core: position tracking and conflict resolution for
//! AI-generated editing suggestions
//!
//! This crate provides the engine behind a suggestion-reviewing editor:
//! - Character offset ↔ document position mapping with a bounded cache
//! - Interval index for viewport and overlap queries
//! - Conflict detection, resolution and cascade effects of accepted edits
//! - Snapshot-based undo/redo over the document and the suggestion list
//! - Decoration projection with incremental diffs for the renderer

pub mod config;
pub mod conflict;
pub mod document;
pub mod editing;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod position;
pub mod render;
pub mod request;
pub mod session;
pub mod spatial;
pub mod suggestion;
pub mod text;
pub mod wasm;

// Re-export WASM types for direct use
pub use wasm::WasmSuggestionEngine;

// Re-export primary types
pub use config::EngineConfig;
pub use conflict::{CascadeEffects, ConflictGroup, ConflictReport, ConflictResolver, Resolution, Strategy};
pub use document::{BlockKind, Document, DocumentModel};
pub use editing::{Bias, Mapping, Step, StepMap};
pub use error::{DocumentError, EngineError, IngestError, Result, SessionError};
pub use history::{HistoryStack, Snapshot};
pub use lifecycle::{ActionOutcome, RealignOutcome, SuggestionManager};
pub use position::PositionMapper;
pub use render::{Decoration, DecorationDiff, DecorationPatch};
pub use request::{RequestTarget, RequestTicket};
pub use session::SessionSnapshot;
pub use spatial::{SpatialIndex, ViewportQuery};
pub use suggestion::{EditType, IngestReport, RawSuggestion, Suggestion, SuggestionId, SuggestionState};

use render::{project_decorations, DiffEngine};

/// The editor state a host drives: the suggestion manager plus the render
/// and persistence bookkeeping around it
pub struct SuggestionEditor {
    pub manager: SuggestionManager,
    pub config: EngineConfig,
    diff_engine: DiffEngine,
    last_saved: u64,
}

impl Default for SuggestionEditor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SuggestionEditor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            manager: SuggestionManager::new(&config),
            config,
            diff_engine: DiffEngine::new(),
            last_saved: history::current_timestamp(),
        }
    }

    /// Create an editor with a manuscript already loaded
    pub fn with_text(text: &str, config: EngineConfig) -> Self {
        let mut editor = Self::new(config);
        editor.load_text(text);
        editor
    }

    pub fn load_text(&mut self, text: &str) {
        self.manager.load_text(text);
        self.diff_engine.reset();
    }

    pub fn text(&self) -> String {
        self.manager.text()
    }

    /// Parse a source response body and ingest it
    ///
    /// `source` is the text the response was generated from, when it is not
    /// the current document.
    pub fn ingest_json(&mut self, body: &str, source: Option<&str>) -> Result<IngestReport> {
        let raws = suggestion::Ingestor::parse_response(body)?;
        Ok(self.manager.ingest(raws, source))
    }

    /// Current decorations for every visible suggestion
    pub fn decorations(&self) -> Vec<Decoration> {
        project_decorations(self.manager.suggestions(), self.manager.document())
    }

    /// Decorations intersecting the visible document range `[start, end)`,
    /// answered from the spatial index
    pub fn decorations_in(&mut self, start: usize, end: usize) -> Vec<Decoration> {
        let (document, visible) = self.manager.visible(start, end);
        project_decorations(visible, document)
    }

    /// Changes since the last call
    pub fn decoration_diff(&mut self) -> DecorationDiff {
        let current = self.decorations();
        let version = self.manager.document().version();
        self.diff_engine.compute_diff(current, version)
    }

    /// Changes within the visible range since the last call
    ///
    /// Decorations scrolled out of `[start, end)` come back as removals.
    pub fn decoration_diff_in(&mut self, start: usize, end: usize) -> DecorationDiff {
        let current = self.decorations_in(start, end);
        let version = self.manager.document().version();
        self.diff_engine.compute_diff(current, version)
    }

    /// Force the next diff to carry every decoration
    pub fn reset_decorations(&mut self) {
        self.diff_engine.reset();
    }

    /// Whether the autosave interval has elapsed since the last save
    pub fn autosave_due(&self, now: u64) -> bool {
        now.saturating_sub(self.last_saved) >= self.config.autosave_interval_ms
    }

    pub fn mark_saved(&mut self, now: u64) {
        self.last_saved = now;
    }

    /// Serialize the session and mark it saved
    pub fn save_session(&mut self) -> Result<String> {
        let snapshot = self.manager.to_session();
        let json = snapshot.to_json()?;
        self.mark_saved(snapshot.timestamp);
        tracing::debug!(bytes = json.len(), "saved session");
        Ok(json)
    }

    pub fn restore_session(&mut self, json: &str) -> Result<RealignOutcome> {
        let snapshot = SessionSnapshot::from_json(json)?;
        let timestamp = snapshot.timestamp;
        let outcome = self.manager.restore(snapshot);
        self.diff_engine.reset();
        self.mark_saved(timestamp);
        Ok(outcome)
    }
}
