//! Edit steps applied to the document

use crate::text::char_len;

/// An atomic change expressed in document positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Insert text at a position
    Insert { pos: usize, text: String },
    /// Delete the range `from..to`
    Delete { from: usize, to: usize },
    /// Replace the range `from..to` with text
    Replace { from: usize, to: usize, text: String },
}

impl Step {
    /// Create an insert step
    pub fn insert(pos: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            pos,
            text: text.into(),
        }
    }

    /// Create a delete step
    pub fn delete(from: usize, to: usize) -> Self {
        Self::Delete { from, to }
    }

    /// Create a replace step
    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self::Replace {
            from,
            to,
            text: text.into(),
        }
    }

    /// Normalize into `(from, to, inserted text)`
    pub fn as_replace(&self) -> (usize, usize, &str) {
        match self {
            Step::Insert { pos, text } => (*pos, *pos, text.as_str()),
            Step::Delete { from, to } => (*from, *to, ""),
            Step::Replace { from, to, text } => (*from, *to, text.as_str()),
        }
    }

    /// Range of the document touched by this step before it is applied
    pub fn affected_range(&self) -> (usize, usize) {
        let (from, to, _) = self.as_replace();
        (from, to)
    }

    /// Document positions the inserted text occupies once applied.
    /// Each `'\n'` becomes a block close plus a block open.
    pub fn inserted_size(&self) -> usize {
        let (_, _, text) = self.as_replace();
        char_len(text) + text.matches('\n').count()
    }
}
