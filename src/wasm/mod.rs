//! WASM bindings for the suggestion engine
//!
//! Structured values cross the boundary as JSON strings; decorations for
//! the hot render path go through the flat [`DecorationBuffer`].

pub mod flat_buffer;

use crate::conflict::Strategy;
use crate::request::{RequestTarget, RequestTicket};
use crate::suggestion::{IngestReport, PhaseReviewItem, SuggestionId};
use crate::{EngineConfig, SuggestionEditor};
use flat_buffer::DecorationBuffer;
use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(to_js_error)
}

/// Parse a bare enum name such as `"merge"` or `"cascade"`
fn parse_name<T: DeserializeOwned>(name: &str) -> Result<T, JsValue> {
    serde_json::from_value(serde_json::Value::String(name.to_string())).map_err(to_js_error)
}

/// Serializable ingest summary for JS
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub accepted: Vec<u64>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub index: usize,
    pub original: Option<String>,
    pub reason: String,
}

impl From<&IngestReport> for IngestSummary {
    fn from(report: &IngestReport) -> Self {
        Self {
            accepted: report.accepted.iter().map(|s| s.id.0).collect(),
            rejected: report
                .rejected
                .iter()
                .map(|r| RejectedRecord {
                    index: r.index,
                    original: r.original.clone(),
                    reason: format!("{:?}", r.reason),
                })
                .collect(),
        }
    }
}

/// WASM-exposed engine wrapper
#[wasm_bindgen]
pub struct WasmSuggestionEngine {
    editor: SuggestionEditor,
    buffer: DecorationBuffer,
}

#[wasm_bindgen]
impl WasmSuggestionEngine {
    /// Create an engine with default tunables
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            editor: SuggestionEditor::default(),
            buffer: DecorationBuffer::new(),
        }
    }

    /// Create an engine from a JSON configuration; missing fields use defaults
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<WasmSuggestionEngine, JsValue> {
        let config = EngineConfig::from_json(config_json).map_err(to_js_error)?;
        Ok(Self {
            editor: SuggestionEditor::new(config),
            buffer: DecorationBuffer::new(),
        })
    }

    #[wasm_bindgen(js_name = loadText)]
    pub fn load_text(&mut self, text: &str) {
        self.editor.load_text(text);
    }

    #[wasm_bindgen(js_name = getText)]
    pub fn get_text(&self) -> String {
        self.editor.text()
    }

    /// Ingest a suggestion source response body (returns JSON summary)
    pub fn ingest(&mut self, body: &str, source: Option<String>) -> Result<String, JsValue> {
        let report = self
            .editor
            .ingest_json(body, source.as_deref())
            .map_err(to_js_error)?;
        to_json(&IngestSummary::from(&report))
    }

    /// Start a request; the returned generation identifies its response
    #[wasm_bindgen(js_name = beginRequest)]
    pub fn begin_request(&mut self, target: &str) -> Result<u64, JsValue> {
        let target: RequestTarget = parse_name(target)?;
        Ok(self.editor.manager.begin_request(target).generation)
    }

    #[wasm_bindgen(js_name = cancelRequest)]
    pub fn cancel_request(&mut self, target: &str) -> Result<bool, JsValue> {
        let target: RequestTarget = parse_name(target)?;
        Ok(self.editor.manager.cancel_request(target))
    }

    /// Ingest the response to an earlier request; stale responses throw
    #[wasm_bindgen(js_name = ingestResponse)]
    pub fn ingest_response(
        &mut self,
        target: &str,
        generation: u64,
        body: &str,
        source: Option<String>,
    ) -> Result<String, JsValue> {
        let ticket = RequestTicket {
            target: parse_name(target)?,
            generation,
        };
        let report = self
            .editor
            .manager
            .ingest_response(&ticket, body, source.as_deref())
            .map_err(to_js_error)?;
        to_json(&IngestSummary::from(&report))
    }

    /// Load the generic pattern-based suggestions (returns JSON summary)
    #[wasm_bindgen(js_name = ingestFallback)]
    pub fn ingest_fallback(&mut self) -> Result<String, JsValue> {
        let report = self.editor.manager.ingest_fallback();
        to_json(&IngestSummary::from(&report))
    }

    /// Accept a suggestion (returns JSON outcome, or `null` if not actionable)
    pub fn accept(&mut self, id: u64) -> Result<String, JsValue> {
        to_json(&self.editor.manager.accept(SuggestionId(id)))
    }

    pub fn reject(&mut self, id: u64) -> bool {
        self.editor.manager.reject(SuggestionId(id))
    }

    /// Accept with user-edited text
    pub fn revise(&mut self, id: u64, text: &str) -> Result<String, JsValue> {
        to_json(&self.editor.manager.revise(SuggestionId(id), text))
    }

    pub fn revert(&mut self, id: u64) -> Result<String, JsValue> {
        to_json(&self.editor.manager.revert(SuggestionId(id)))
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        self.editor.manager.dismiss(SuggestionId(id))
    }

    #[wasm_bindgen(js_name = clearAlignError)]
    pub fn clear_align_error(&mut self, id: u64) -> bool {
        self.editor.manager.clear_align_error(SuggestionId(id))
    }

    #[wasm_bindgen(js_name = clearAll)]
    pub fn clear_all(&mut self) -> usize {
        self.editor.manager.clear_all()
    }

    /// Undo last action
    pub fn undo(&mut self) -> bool {
        self.editor.manager.undo()
    }

    /// Redo last undone action
    pub fn redo(&mut self) -> bool {
        self.editor.manager.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.editor.manager.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.editor.manager.can_redo()
    }

    /// Replace the text after a free-form user edit (returns JSON realign outcome)
    #[wasm_bindgen(js_name = editText)]
    pub fn edit_text(&mut self, text: &str) -> Result<String, JsValue> {
        to_json(&self.editor.manager.edit_text(text))
    }

    /// Settle overlaps with `"priority"`, `"merge"` or `"user_choice"`
    #[wasm_bindgen(js_name = resolveConflicts)]
    pub fn resolve_conflicts(&mut self, strategy: &str, allow_merging: bool) -> Result<String, JsValue> {
        let strategy: Strategy = parse_name(strategy)?;
        to_json(&self.editor.manager.resolve_conflicts(strategy, allow_merging))
    }

    #[wasm_bindgen(js_name = conflictReport)]
    pub fn conflict_report(&self) -> Result<String, JsValue> {
        to_json(&self.editor.manager.conflict_report())
    }

    /// Apply keep/update/remove decisions after a phase completes
    #[wasm_bindgen(js_name = applyPhaseReview)]
    pub fn apply_phase_review(&mut self, items_json: &str) -> Result<usize, JsValue> {
        let items: Vec<PhaseReviewItem> = serde_json::from_str(items_json).map_err(to_js_error)?;
        Ok(self.editor.manager.apply_phase_review(&items))
    }

    #[wasm_bindgen(js_name = isPhaseComplete)]
    pub fn is_phase_complete(&self, edit_type: &str) -> bool {
        self.editor.manager.is_phase_complete(crate::EditType::parse(edit_type))
    }

    /// Full suggestion list (returns JSON)
    #[wasm_bindgen(js_name = getSuggestions)]
    pub fn get_suggestions(&self) -> Result<String, JsValue> {
        to_json(&self.editor.manager.suggestions())
    }

    /// Decoration patches since the previous call (returns JSON)
    #[wasm_bindgen(js_name = decorationDiff)]
    pub fn decoration_diff(&mut self) -> Result<String, JsValue> {
        to_json(&self.editor.decoration_diff())
    }

    /// Decoration patches within the visible document range (returns JSON)
    #[wasm_bindgen(js_name = viewportDecorationDiff)]
    pub fn viewport_decoration_diff(&mut self, start: usize, end: usize) -> Result<String, JsValue> {
        to_json(&self.editor.decoration_diff_in(start, end))
    }

    /// Encode the decorations intersecting the visible document range into
    /// the flat buffer; returns the count
    #[wasm_bindgen(js_name = updateDecorationBuffer)]
    pub fn update_decoration_buffer(&mut self, start: usize, end: usize) -> usize {
        let decorations = self.editor.decorations_in(start, end);
        let version = self.editor.manager.document().version();
        self.buffer
            .write_decorations(version, &decorations, &self.editor.text());
        decorations.len()
    }

    #[wasm_bindgen(js_name = decorationBufferPtr)]
    pub fn decoration_buffer_ptr(&self) -> u32 {
        self.buffer.u32_ptr()
    }

    #[wasm_bindgen(js_name = decorationBufferLen)]
    pub fn decoration_buffer_len(&self) -> u32 {
        self.buffer.u32_len()
    }

    #[wasm_bindgen(js_name = saveSession)]
    pub fn save_session(&mut self) -> Result<String, JsValue> {
        self.editor.save_session().map_err(to_js_error)
    }

    /// Restore a saved session (returns JSON realign outcome)
    #[wasm_bindgen(js_name = restoreSession)]
    pub fn restore_session(&mut self, json: &str) -> Result<String, JsValue> {
        let outcome = self.editor.restore_session(json).map_err(to_js_error)?;
        to_json(&outcome)
    }

    /// Whether the host should persist now; `now` is milliseconds since the epoch
    #[wasm_bindgen(js_name = autosaveDue)]
    pub fn autosave_due(&self, now: f64) -> bool {
        self.editor.autosave_due(now as u64)
    }
}

impl Default for WasmSuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}
