//! Suggestion records and the editorial hierarchy

mod ingest;

pub use ingest::{
    fallback_suggestions, AcceptedEdit, CascadeRequest, IngestRejection, IngestReport, Ingestor,
    PhaseAction, PhaseReviewItem, RawSuggestion, SourceResponse, SuggestionRequest,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier assigned at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SuggestionId(pub u64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Editorial phase of a suggestion, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EditType {
    Developmental,
    Structural,
    Line,
    Copy,
    Proof,
    /// Anything the hierarchy does not know; sorts last
    Unknown,
}

impl EditType {
    /// Every known type in hierarchy order
    pub const HIERARCHY: [EditType; 5] = [
        EditType::Developmental,
        EditType::Structural,
        EditType::Line,
        EditType::Copy,
        EditType::Proof,
    ];

    /// Parse case-insensitively. `Substantive` is an alias of `Line`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "developmental" => EditType::Developmental,
            "structural" => EditType::Structural,
            "line" | "substantive" => EditType::Line,
            "copy" => EditType::Copy,
            "proof" | "proofreading" => EditType::Proof,
            _ => EditType::Unknown,
        }
    }

    /// Fixed editorial priority: Developmental=5 .. Proof=1, unknown 0
    pub fn priority(self) -> u8 {
        match self {
            EditType::Developmental => 5,
            EditType::Structural => 4,
            EditType::Line => 3,
            EditType::Copy => 2,
            EditType::Proof => 1,
            EditType::Unknown => 0,
        }
    }

    /// Lower levels that should be regenerated after accepting this type
    pub fn cascade_targets(self) -> &'static [EditType] {
        match self {
            EditType::Developmental => &[EditType::Structural, EditType::Line, EditType::Copy],
            EditType::Structural => &[EditType::Line, EditType::Copy],
            EditType::Line => &[EditType::Copy],
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditType::Developmental => "Developmental",
            EditType::Structural => "Structural",
            EditType::Line => "Line",
            EditType::Copy => "Copy",
            EditType::Proof => "Proof",
            EditType::Unknown => "Unknown",
        }
    }
}

impl From<String> for EditType {
    fn from(name: String) -> Self {
        EditType::parse(&name)
    }
}

impl From<EditType> for String {
    fn from(edit_type: EditType) -> Self {
        edit_type.as_str().to_string()
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionState {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Revised,
}

impl SuggestionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SuggestionState::Pending)
    }
}

/// Conditions that keep a suggestion from being independently actionable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuggestionFlags {
    /// Mapping confidence fell below the review threshold
    pub needs_review: bool,
    /// Shifted far enough by a cascade that its anchor must be re-found
    pub needs_revalidation: bool,
    /// Anchor text no longer found in the document
    pub align_error: bool,
    /// Overlapped an accepted edit; anchor text no longer exists intact
    pub invalidated: bool,
}

/// A proposed edit anchored to a range of the manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: SuggestionId,
    pub edit_type: EditType,
    /// Exact text expected at the target range
    pub original: String,
    /// Proposed replacement text
    pub replacement: String,
    #[serde(default)]
    pub why: String,
    /// Half-open char range into the plain-text rendering
    pub char_start: usize,
    pub char_end: usize,
    /// The same range in document positions, if it could be mapped
    pub doc_start: Option<usize>,
    pub doc_end: Option<usize>,
    #[serde(default)]
    pub state: SuggestionState,
    pub confidence: f64,
    /// User-edited replacement, set only when revised
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub flags: SuggestionFlags,
    /// Members a merged suggestion was built from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<SuggestionId>,
}

impl Suggestion {
    /// Create a pending, unmapped suggestion over a char range
    pub fn new(
        id: SuggestionId,
        edit_type: EditType,
        original: impl Into<String>,
        replacement: impl Into<String>,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        debug_assert!(char_start < char_end, "empty suggestion range");
        Self {
            id,
            edit_type,
            original: original.into(),
            replacement: replacement.into(),
            why: String::new(),
            char_start,
            char_end,
            doc_start: None,
            doc_end: None,
            state: SuggestionState::Pending,
            confidence: 1.0,
            revision: None,
            flags: SuggestionFlags::default(),
            merged_from: Vec::new(),
        }
    }

    pub fn with_why(mut self, why: impl Into<String>) -> Self {
        self.why = why.into();
        self
    }

    pub fn with_doc_range(mut self, start: usize, end: usize) -> Self {
        self.doc_start = Some(start);
        self.doc_end = Some(end);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn priority(&self) -> u8 {
        self.edit_type.priority()
    }

    /// Document range, if mapped
    pub fn doc_range(&self) -> Option<(usize, usize)> {
        match (self.doc_start, self.doc_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Length of the document span, falling back to the char span
    pub fn span_len(&self) -> usize {
        match self.doc_range() {
            Some((start, end)) => end.saturating_sub(start),
            None => self.char_end.saturating_sub(self.char_start),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.doc_range().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.state == SuggestionState::Pending
    }

    /// Pending, placed and not flagged as broken
    pub fn is_actionable(&self) -> bool {
        self.is_pending()
            && self.is_mapped()
            && !self.flags.align_error
            && !self.flags.invalidated
    }

    /// Text that accepting or revising this suggestion commits
    pub fn committed_text(&self) -> &str {
        self.revision.as_deref().unwrap_or(&self.replacement)
    }

    /// Whether the document ranges intersect (half-open)
    pub fn overlaps(&self, other: &Suggestion) -> bool {
        match (self.doc_range(), other.doc_range()) {
            (Some((a_start, a_end)), Some((b_start, b_end))) => {
                ranges_overlap(a_start, a_end, b_start, b_end)
            }
            _ => false,
        }
    }
}

/// Half-open interval intersection
pub fn ranges_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    !(a_end <= b_start || b_end <= a_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_type_parse() {
        assert_eq!(EditType::parse("line"), EditType::Line);
        assert_eq!(EditType::parse("Substantive"), EditType::Line);
        assert_eq!(EditType::parse(" DEVELOPMENTAL "), EditType::Developmental);
        assert_eq!(EditType::parse("style"), EditType::Unknown);
    }

    #[test]
    fn test_priority_order() {
        let priorities: Vec<_> = EditType::HIERARCHY.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![5, 4, 3, 2, 1]);
        assert_eq!(EditType::Unknown.priority(), 0);
    }

    #[test]
    fn test_cascade_targets() {
        assert_eq!(
            EditType::Developmental.cascade_targets(),
            &[EditType::Structural, EditType::Line, EditType::Copy]
        );
        assert_eq!(EditType::Line.cascade_targets(), &[EditType::Copy]);
        assert!(EditType::Proof.cascade_targets().is_empty());
    }

    #[test]
    fn test_ranges_overlap() {
        assert!(ranges_overlap(0, 5, 4, 9));
        assert!(!ranges_overlap(0, 5, 5, 9));
        assert!(ranges_overlap(3, 4, 0, 10));
    }

    #[test]
    fn test_actionable() {
        let mut s = Suggestion::new(SuggestionId(1), EditType::Copy, "a", "b", 0, 1);
        assert!(!s.is_actionable());
        s = s.with_doc_range(1, 2);
        assert!(s.is_actionable());
        s.flags.align_error = true;
        assert!(!s.is_actionable());
    }

    #[test]
    fn test_serde_shape() {
        let s = Suggestion::new(SuggestionId(7), EditType::Line, "teh", "the", 4, 7)
            .with_doc_range(5, 8);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"editType\":\"Line\""));
        assert!(json.contains("\"state\":\"pending\""));
        let back: Suggestion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
