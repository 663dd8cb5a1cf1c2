//! Block-level nodes of the manuscript tree

use serde::{Deserialize, Serialize};

/// Stable identifier for blocks that survives edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockId(pub u64);

/// The kind of block element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockKind {
    /// Regular paragraph
    #[default]
    Paragraph,
    /// Heading with level (1-6)
    Heading { level: u8 },
    /// List item
    ListItem { indent_level: u8 },
    /// Quoted passage
    BlockQuote,
}

impl BlockKind {
    /// Create a heading, clamping the level into 1..=6
    pub fn heading(level: u8) -> Self {
        BlockKind::Heading {
            level: level.clamp(1, 6),
        }
    }

    /// Check if this is a heading
    pub fn is_heading(&self) -> bool {
        matches!(self, BlockKind::Heading { .. })
    }

    /// Check if this is a list item
    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::ListItem { .. })
    }

    /// Name used in structural context reports
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading { .. } => "heading",
            BlockKind::ListItem { .. } => "list_item",
            BlockKind::BlockQuote => "blockquote",
        }
    }
}

/// A text-bearing block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    text: String,
    /// Length of `text` in chars
    char_len: usize,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self {
            id,
            kind,
            text,
            char_len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the block text in chars
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Number of document positions the block occupies (open + text + close)
    pub fn node_size(&self) -> usize {
        self.char_len + 2
    }
}
