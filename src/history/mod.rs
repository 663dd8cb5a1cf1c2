//! Snapshot-based undo/redo
//!
//! Every state-changing action records the whole `{document, suggestions}`
//! state beforehand. Undo swaps the current state for the latest snapshot;
//! any new action clears the redo stack (linear history, no branches).

use crate::document::Document;
use crate::suggestion::Suggestion;
use std::collections::VecDeque;

/// Immutable copy of the manager's state
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Action that was about to run when the snapshot was taken
    pub label: &'static str,
    pub document: Document,
    pub suggestions: Vec<Suggestion>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl Snapshot {
    pub fn new(label: &'static str, document: &Document, suggestions: &[Suggestion]) -> Self {
        Self {
            label,
            document: document.clone(),
            suggestions: suggestions.to_vec(),
            timestamp: current_timestamp(),
        }
    }

    /// Plain text of the captured document
    pub fn text(&self) -> String {
        self.document.text()
    }
}

/// Bounded undo ring plus redo stack
#[derive(Debug, Clone)]
pub struct HistoryStack {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
}

impl HistoryStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record the state preceding a new action
    pub fn record(&mut self, snapshot: Snapshot) {
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Step back; `current` becomes redoable
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward again; `current` becomes undoable
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the action the next undo would revert
    pub fn peek_undo(&self) -> Option<&'static str> {
        self.undo_stack.back().map(|s| s.label)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
