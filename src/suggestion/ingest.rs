//! Ingestion boundary for externally generated suggestions
//!
//! The suggestion source speaks JSON with slightly different field names
//! depending on the call site. Everything is normalized here into
//! [`Suggestion`] records; records whose `original` is not an exact
//! substring of the submitted text are discarded with a reason.

use super::{EditType, Suggestion, SuggestionId};
use crate::error::IngestError;
use crate::text::{char_len, char_slice, find_all, CharTable};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Request sent to the suggestion source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub text: String,
    pub edit_types: Vec<EditType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A suggestion record as received, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSuggestion {
    #[serde(default, alias = "originalText")]
    pub original: Option<String>,
    #[serde(default, alias = "suggestionText", alias = "replacement")]
    pub suggestion: Option<String>,
    #[serde(default, rename = "type", alias = "editType")]
    pub edit_type: Option<String>,
    #[serde(default, alias = "reason")]
    pub why: Option<String>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl RawSuggestion {
    pub fn new(original: impl Into<String>, suggestion: impl Into<String>, edit_type: EditType) -> Self {
        Self {
            original: Some(original.into()),
            suggestion: Some(suggestion.into()),
            edit_type: Some(edit_type.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn because(mut self, why: impl Into<String>) -> Self {
        self.why = Some(why.into());
        self
    }
}

/// Response envelope of the suggestion source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    pub success: bool,
    #[serde(default)]
    pub suggestions: Vec<RawSuggestion>,
}

/// An accepted edit handed to the cascade source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedEdit {
    pub original: String,
    pub suggestion: String,
    pub why: String,
}

/// Request for lower-level suggestions contextualized by an accepted edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeRequest {
    pub accepted: AcceptedEdit,
    pub source_level: EditType,
    pub target_levels: Vec<EditType>,
}

impl CascadeRequest {
    /// Build the request for an accepted suggestion, if its type cascades
    pub fn for_accepted(suggestion: &Suggestion) -> Option<Self> {
        let targets = suggestion.edit_type.cascade_targets();
        if targets.is_empty() {
            return None;
        }
        Some(Self {
            accepted: AcceptedEdit {
                original: suggestion.original.clone(),
                suggestion: suggestion.committed_text().to_string(),
                why: suggestion.why.clone(),
            },
            source_level: suggestion.edit_type,
            target_levels: targets.to_vec(),
        })
    }
}

/// Per-suggestion verdict after an editorial phase completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PhaseAction {
    Keep,
    Update {
        replacement: String,
        #[serde(default)]
        why: Option<String>,
    },
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReviewItem {
    pub id: SuggestionId,
    #[serde(flatten)]
    pub action: PhaseAction,
}

/// Why a raw record was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    EmptyOriginal,
    NotInText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRejection {
    /// Position of the record in the submitted batch
    pub index: usize,
    pub original: Option<String>,
    pub reason: RejectReason,
}

/// Outcome of normalizing a batch
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub accepted: Vec<Suggestion>,
    pub rejected: Vec<IngestRejection>,
}

/// Normalizes raw records against the text they were produced from
pub struct Ingestor<'a> {
    text: &'a str,
    table: CharTable,
    /// Ranges already taken by earlier records of this batch
    claimed: FxHashSet<(usize, usize)>,
}

impl<'a> Ingestor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            table: CharTable::new(text),
            claimed: FxHashSet::default(),
        }
    }

    /// Parse a source response body
    pub fn parse_response(json: &str) -> Result<Vec<RawSuggestion>, IngestError> {
        let response: SourceResponse =
            serde_json::from_str(json).map_err(|e| IngestError::Malformed(e.to_string()))?;
        if !response.success {
            return Err(IngestError::SourceFailed);
        }
        Ok(response.suggestions)
    }

    /// Normalize a batch, allocating ids for accepted records
    pub fn ingest(
        &mut self,
        raws: Vec<RawSuggestion>,
        alloc: &mut dyn FnMut() -> SuggestionId,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        for (index, raw) in raws.into_iter().enumerate() {
            match self.normalize(raw, alloc) {
                Ok(suggestion) => report.accepted.push(suggestion),
                Err((original, reason)) => {
                    tracing::warn!(index, ?reason, "discarding suggestion");
                    report.rejected.push(IngestRejection {
                        index,
                        original,
                        reason,
                    });
                }
            }
        }

        tracing::debug!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "ingested suggestion batch"
        );
        report
    }

    fn normalize(
        &mut self,
        raw: RawSuggestion,
        alloc: &mut dyn FnMut() -> SuggestionId,
    ) -> Result<Suggestion, (Option<String>, RejectReason)> {
        let original = match raw.original {
            Some(original) => original,
            None => return Err((None, RejectReason::MissingField("original"))),
        };
        let replacement = match raw.suggestion {
            Some(replacement) => replacement,
            None => return Err((Some(original), RejectReason::MissingField("suggestion"))),
        };
        if original.is_empty() {
            return Err((Some(original), RejectReason::EmptyOriginal));
        }

        let (start, end, confidence) = match self.locate(&original, raw.start, raw.end) {
            Some(found) => found,
            None => return Err((Some(original), RejectReason::NotInText)),
        };
        self.claimed.insert((start, end));

        let edit_type = raw
            .edit_type
            .as_deref()
            .map(EditType::parse)
            .unwrap_or(EditType::Unknown);

        Ok(
            Suggestion::new(alloc(), edit_type, original, replacement, start, end)
                .with_why(raw.why.unwrap_or_default())
                .with_confidence(confidence),
        )
    }

    /// Find the char range of `original`, trusting supplied offsets only
    /// when they slice exactly that text
    fn locate(
        &self,
        original: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Option<(usize, usize, f64)> {
        if let (Some(start), Some(end)) = (start, end) {
            if start < end
                && end <= self.table.char_len()
                && char_slice(self.text, start, end) == original
            {
                return Some((start, end, 1.0));
            }
        }

        let occurrences = find_all(self.text, original, 0);
        if occurrences.is_empty() {
            return None;
        }

        let unclaimed: Vec<_> = occurrences
            .iter()
            .copied()
            .filter(|range| !self.claimed.contains(range))
            .collect();
        let pool = if unclaimed.is_empty() {
            &occurrences
        } else {
            &unclaimed
        };

        match start {
            // Offsets were supplied but wrong: nearest occurrence, lower confidence
            Some(hint) => pool
                .iter()
                .min_by_key(|(s, _)| s.abs_diff(hint))
                .map(|&(s, e)| (s, e, 0.8)),
            None => pool.first().map(|&(s, e)| (s, e, 1.0)),
        }
    }
}

/// Degraded pattern-based suggestions used when the source is unavailable
pub fn fallback_suggestions(text: &str) -> Vec<RawSuggestion> {
    let mut out = Vec::new();

    for (start, end) in non_overlapping(text, "  ") {
        out.push(
            RawSuggestion::new("  ", " ", EditType::Proof)
                .at(start, end)
                .because("Double space"),
        );
    }

    for mark in [",", ".", ";", ":", "!", "?"] {
        let pattern = format!(" {}", mark);
        for (start, end) in non_overlapping(text, &pattern) {
            out.push(
                RawSuggestion::new(pattern.clone(), mark, EditType::Proof)
                    .at(start, end)
                    .because("Space before punctuation"),
            );
        }
    }

    let words = words(text);
    for pair in words.windows(2) {
        let (a_start, a_end) = pair[0];
        let (b_start, b_end) = pair[1];
        let first = char_slice(text, a_start, a_end);
        let second = char_slice(text, b_start, b_end);
        if b_start == a_end + 1
            && char_slice(text, a_end, b_start) == " "
            && first.to_lowercase() == second.to_lowercase()
        {
            out.push(
                RawSuggestion::new(format!("{} {}", first, second), first, EditType::Proof)
                    .at(a_start, b_end)
                    .because("Repeated word"),
            );
        }
    }

    out.sort_by_key(|raw| raw.start);
    out
}

fn non_overlapping(text: &str, pattern: &str) -> Vec<(usize, usize)> {
    let mut last_end = 0;
    let mut out = Vec::new();
    for (start, end) in find_all(text, pattern, 0) {
        if start >= last_end {
            out.push((start, end));
            last_end = end;
        }
    }
    out
}

/// Char ranges of alphanumeric runs
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut current: Option<usize> = None;
    for (i, c) in text.chars().enumerate() {
        match (c.is_alphanumeric() || c == '\'', current) {
            (true, None) => current = Some(i),
            (false, Some(start)) => {
                out.push((start, i));
                current = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current {
        out.push((start, char_len(text)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> impl FnMut() -> SuggestionId {
        let mut next = 0;
        move || {
            next += 1;
            SuggestionId(next)
        }
    }

    #[test]
    fn test_field_name_variants() {
        let json = r#"{"success": true, "suggestions": [
            {"original": "quick", "suggestion": "speedy", "type": "Line", "reason": "vivid"},
            {"originalText": "lazy", "suggestionText": "idle", "editType": "copy"},
            {"original": "fox", "replacement": "cat", "type": "substantive"}
        ]}"#;
        let raws = Ingestor::parse_response(json).unwrap();
        assert_eq!(raws.len(), 3);
        assert_eq!(raws[0].why.as_deref(), Some("vivid"));
        assert_eq!(raws[1].original.as_deref(), Some("lazy"));
        assert_eq!(raws[2].suggestion.as_deref(), Some("cat"));

        let text = "The quick brown fox jumps over the lazy dog.";
        let mut alloc = counter();
        let report = Ingestor::new(text).ingest(raws, &mut alloc);
        assert_eq!(report.accepted.len(), 3);
        assert_eq!(report.accepted[1].edit_type, EditType::Copy);
        assert_eq!(report.accepted[2].edit_type, EditType::Line);
        assert_eq!(
            (report.accepted[0].char_start, report.accepted[0].char_end),
            (4, 9)
        );
    }

    #[test]
    fn test_failed_and_malformed_responses() {
        assert_eq!(
            Ingestor::parse_response(r#"{"success": false}"#),
            Err(IngestError::SourceFailed)
        );
        assert!(matches!(
            Ingestor::parse_response("not json"),
            Err(IngestError::Malformed(_))
        ));
    }

    #[test]
    fn test_discards_text_not_in_document() {
        let raws = vec![
            RawSuggestion::new("absent", "x", EditType::Proof),
            RawSuggestion {
                original: None,
                ..RawSuggestion::default()
            },
            RawSuggestion::new("", "x", EditType::Proof),
        ];
        let mut alloc = counter();
        let report = Ingestor::new("some text").ingest(raws, &mut alloc);
        assert!(report.accepted.is_empty());
        let reasons: Vec<_> = report.rejected.iter().map(|r| r.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::NotInText,
                RejectReason::MissingField("original"),
                RejectReason::EmptyOriginal
            ]
        );
    }

    #[test]
    fn test_wrong_offsets_relocate_to_nearest() {
        let text = "the cat saw the dog near the barn";
        let raws = vec![RawSuggestion::new("the", "a", EditType::Copy).at(14, 17)];
        let mut alloc = counter();
        let report = Ingestor::new(text).ingest(raws, &mut alloc);
        let s = &report.accepted[0];
        assert_eq!((s.char_start, s.char_end), (12, 15));
        assert_eq!(s.confidence, 0.8);
    }

    #[test]
    fn test_duplicates_claim_distinct_occurrences() {
        let text = "the the end, the";
        let raws = vec![
            RawSuggestion::new("the", "a", EditType::Proof),
            RawSuggestion::new("the", "a", EditType::Proof),
        ];
        let mut alloc = counter();
        let report = Ingestor::new(text).ingest(raws, &mut alloc);
        assert_eq!(report.accepted[0].char_start, 0);
        assert_eq!(report.accepted[1].char_start, 4);
        assert_ne!(report.accepted[0].id, report.accepted[1].id);
    }

    #[test]
    fn test_fallback_patterns() {
        let text = "It was the the best  of times , really.";
        let raws = fallback_suggestions(text);
        let originals: Vec<_> = raws.iter().filter_map(|r| r.original.clone()).collect();
        assert_eq!(originals, vec!["the the", "  ", " ,"]);

        let mut alloc = counter();
        let report = Ingestor::new(text).ingest(raws, &mut alloc);
        assert_eq!(report.accepted.len(), 3);
        assert!(report.accepted.iter().all(|s| s.confidence == 1.0));
    }

    #[test]
    fn test_cascade_request() {
        let s = Suggestion::new(SuggestionId(1), EditType::Structural, "a", "b", 0, 1);
        let request = CascadeRequest::for_accepted(&s).unwrap();
        assert_eq!(request.target_levels, vec![EditType::Line, EditType::Copy]);

        let proof = Suggestion::new(SuggestionId(2), EditType::Proof, "a", "b", 0, 1);
        assert!(CascadeRequest::for_accepted(&proof).is_none());
    }

    #[test]
    fn test_phase_review_shape() {
        let json = r#"[{"id": 3, "action": "update", "replacement": "new"}, {"id": 4, "action": "remove"}]"#;
        let items: Vec<PhaseReviewItem> = serde_json::from_str(json).unwrap();
        assert_eq!(
            items[0].action,
            PhaseAction::Update {
                replacement: "new".into(),
                why: None
            }
        );
        assert_eq!(items[1].action, PhaseAction::Remove);
    }
}
