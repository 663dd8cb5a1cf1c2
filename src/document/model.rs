//! The document-model boundary used by position mapping
//!
//! Anything that can enumerate its text-bearing leaves in order, report its
//! size and extract text between two positions can be mapped against. The
//! concrete [`Document`](super::Document) implements it; tests may supply
//! their own models.

use super::block::{BlockId, BlockKind};

/// A leaf visited during an ordered document walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
    /// Text content starting at document position `pos`
    Text { pos: usize, text: &'a str },
    /// An empty text block whose (zero-width) content sits at `pos`
    EmptyBlock { pos: usize },
    /// Boundary between two blocks; renders as one `'\n'` in plain text
    BlockBreak { pos: usize },
}

/// Structural context of a document position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// 0 between blocks, 1 inside a block's content
    pub depth: u8,
    /// Index of the containing block, or of the following block at depth 0
    pub index: usize,
    /// Offset in chars within the block text (0 at depth 0)
    pub text_offset: usize,
    pub block_id: Option<BlockId>,
    pub kind: Option<BlockKind>,
}

impl ResolvedPos {
    /// Whether the position sits inside block content
    pub fn in_text(&self) -> bool {
        self.depth > 0
    }
}

/// Minimum primitive set required from a tree-structured document
pub trait DocumentModel {
    /// Visit leaves in document order until the visitor returns `false`
    fn for_each_leaf(&self, visit: &mut dyn FnMut(Leaf<'_>) -> bool);

    /// Total content size in document positions
    fn content_size(&self) -> usize;

    /// Position at the end of the last block's content
    fn text_end(&self) -> usize;

    /// Plain text between two positions, block boundaries rendered as `'\n'`
    fn text_between(&self, from: usize, to: usize) -> String;

    /// Resolve a position into structural context
    fn resolve(&self, pos: usize) -> Option<ResolvedPos>;

    /// Revision counter used to key cached lookups
    fn version(&self) -> u64 {
        0
    }
}
