//! Projection of suggestions onto document ranges for display

use crate::document::DocumentModel;
use crate::suggestion::{EditType, Suggestion, SuggestionId};
use serde::Serialize;

/// Visual treatment of a decorated range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DecorationKind {
    /// Placed and ready to act on
    Suggestion,
    /// Mapped with low confidence
    NeedsReview,
    /// Anchor text lost; drawn at its last-known range
    AlignError,
}

impl DecorationKind {
    pub fn code(self) -> u32 {
        match self {
            DecorationKind::Suggestion => 0,
            DecorationKind::NeedsReview => 1,
            DecorationKind::AlignError => 2,
        }
    }
}

/// One highlighted range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoration {
    pub id: SuggestionId,
    /// Document range
    pub from: usize,
    pub to: usize,
    /// The same range as char offsets into the plain text
    pub char_start: usize,
    pub char_end: usize,
    pub edit_type: EditType,
    pub kind: DecorationKind,
    /// CSS class for the host
    pub class: String,
    /// RGBA
    pub color: u32,
}

/// Highlight colour per edit type
pub fn edit_type_color(edit_type: EditType) -> u32 {
    match edit_type {
        EditType::Developmental => 0x8E44_ADFF,
        EditType::Structural => 0x2980_B9FF,
        EditType::Line => 0x27AE_60FF,
        EditType::Copy => 0xF39C_12FF,
        EditType::Proof => 0xE74C_3CFF,
        EditType::Unknown => 0x95A5_A6FF,
    }
}

const ALIGN_ERROR_COLOR: u32 = 0x7F8C_8D80;

fn class_for(edit_type: EditType, kind: DecorationKind) -> String {
    let base = format!("suggestion suggestion-{}", edit_type.as_str().to_ascii_lowercase());
    match kind {
        DecorationKind::Suggestion => base,
        DecorationKind::NeedsReview => base + " suggestion-review",
        DecorationKind::AlignError => base + " suggestion-not-found",
    }
}

/// Decorations for pending, mapped suggestions, sorted by start
///
/// Invalidated suggestions are left out. Ranges are clamped to the end of
/// the document text; anything that collapses is skipped.
pub fn project_decorations<'a, D: DocumentModel + ?Sized>(
    suggestions: impl IntoIterator<Item = &'a Suggestion>,
    doc: &D,
) -> Vec<Decoration> {
    let limit = doc.text_end();
    let mut decorations: Vec<Decoration> = suggestions
        .into_iter()
        .filter(|s| s.is_pending() && !s.flags.invalidated)
        .filter_map(|s| {
            let (from, to) = s.doc_range()?;
            let (from, to) = (from.min(limit), to.min(limit));
            if from >= to {
                return None;
            }

            let kind = if s.flags.align_error {
                DecorationKind::AlignError
            } else if s.flags.needs_review {
                DecorationKind::NeedsReview
            } else {
                DecorationKind::Suggestion
            };
            let color = match kind {
                DecorationKind::AlignError => ALIGN_ERROR_COLOR,
                _ => edit_type_color(s.edit_type),
            };

            Some(Decoration {
                id: s.id,
                from,
                to,
                char_start: s.char_start,
                char_end: s.char_end,
                edit_type: s.edit_type,
                kind,
                class: class_for(s.edit_type, kind),
                color,
            })
        })
        .collect();

    decorations.sort_by_key(|d| (d.from, d.to, d.id));
    decorations
}
