//! Tree-structured manuscript document
//!
//! A document is an ordered list of text blocks. Positions use open/close
//! token addressing: entering a block costs one position, every char one
//! position and leaving the block one more, so a block with `n` chars spans
//! `n + 2` positions. The plain-text rendering joins block texts with `'\n'`.

mod block;
mod index;
mod model;

pub use block::{Block, BlockId, BlockKind};
pub use index::BlockIndex;
pub use model::{DocumentModel, Leaf, ResolvedPos};

use crate::editing::{Mapping, Step, StepMap};
use crate::error::DocumentError;
use crate::text::char_slice;

/// The main document structure
#[derive(Debug, Clone)]
pub struct Document {
    /// Blocks in document order; never empty
    blocks: Vec<Block>,
    /// Position index over `blocks`
    index: BlockIndex,
    /// Monotonic version counter
    version: u64,
    /// Next block ID to assign
    next_block_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding one empty paragraph
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// Create a document from plain text, one paragraph per line
    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(
            text.split('\n')
                .map(|line| (BlockKind::Paragraph, line.to_string()))
                .collect(),
        )
    }

    /// Create a document from explicit blocks. Newlines inside a block's
    /// text start new paragraphs.
    pub fn from_blocks(blocks: Vec<(BlockKind, String)>) -> Self {
        let mut doc = Self {
            blocks: Vec::with_capacity(blocks.len().max(1)),
            index: BlockIndex::default(),
            version: 0,
            next_block_id: 0,
        };

        for (kind, text) in blocks {
            for (i, line) in text.split('\n').enumerate() {
                let kind = if i == 0 { kind } else { BlockKind::Paragraph };
                let id = doc.alloc_block_id();
                doc.blocks.push(Block::new(id, kind, line));
            }
        }

        // Ensure at least one block exists
        if doc.blocks.is_empty() {
            let id = doc.alloc_block_id();
            doc.blocks.push(Block::new(id, BlockKind::Paragraph, ""));
        }

        doc.index.rebuild(&doc.blocks);
        doc
    }

    fn alloc_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    /// Get the document version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total content size in positions
    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// Length of the plain-text rendering in chars
    pub fn text_len(&self) -> usize {
        let chars: usize = self.blocks.iter().map(Block::char_len).sum();
        chars + self.blocks.len() - 1
    }

    /// Check if the document has no text
    pub fn is_empty(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0].is_empty()
    }

    /// Get the plain-text rendering
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.blocks.iter().map(|b| b.text().len() + 1).sum());
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(block.text());
        }
        out
    }

    /// Blocks in document order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get block count
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Position of the first char of a block's content
    pub fn content_start(&self, id: BlockId) -> Option<usize> {
        self.index.bounds(id).map(|(open, _)| open + 1)
    }

    /// Apply a step, returning how positions moved
    pub fn apply(&mut self, step: &Step) -> Result<StepMap, DocumentError> {
        let (from, to, text) = step.as_replace();
        let size = self.size();
        if from > to || to > size {
            return Err(DocumentError::InvalidRange { from, to, size });
        }

        let start = self.resolve(from).filter(ResolvedPos::in_text);
        let end = self.resolve(to).filter(ResolvedPos::in_text);
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            (None, _) => return Err(DocumentError::NotInTextBlock(from)),
            (_, None) => return Err(DocumentError::NotInTextBlock(to)),
        };

        let first = &self.blocks[start.index];
        let last = &self.blocks[end.index];
        let mut combined = String::with_capacity(first.text().len() + text.len() + last.text().len());
        combined.push_str(char_slice(first.text(), 0, start.text_offset));
        combined.push_str(text);
        combined.push_str(char_slice(last.text(), end.text_offset, last.char_len()));

        let first_id = first.id;
        let first_kind = first.kind;
        let mut replacement = Vec::new();
        for (i, line) in combined.split('\n').enumerate() {
            let (id, kind) = if i == 0 {
                (first_id, first_kind)
            } else {
                (self.alloc_block_id(), BlockKind::Paragraph)
            };
            replacement.push(Block::new(id, kind, line));
        }

        self.blocks.splice(start.index..=end.index, replacement);
        self.index.rebuild(&self.blocks);
        self.version += 1;

        let map = StepMap::new(from, to - from, step.inserted_size());
        tracing::trace!(from, to, delta = map.delta(), version = self.version, "applied step");
        Ok(map)
    }

    /// Apply several steps in order as one transaction. Later steps are
    /// expressed in positions produced by the earlier ones.
    pub fn apply_all(&mut self, steps: &[Step]) -> Result<Mapping, DocumentError> {
        let mut mapping = Mapping::new();
        for step in steps {
            mapping.push(self.apply(step)?);
        }
        Ok(mapping)
    }
}

impl DocumentModel for Document {
    fn for_each_leaf(&self, visit: &mut dyn FnMut(Leaf<'_>) -> bool) {
        let mut open = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 && !visit(Leaf::BlockBreak { pos: open }) {
                return;
            }
            let leaf = if block.is_empty() {
                Leaf::EmptyBlock { pos: open + 1 }
            } else {
                Leaf::Text {
                    pos: open + 1,
                    text: block.text(),
                }
            };
            if !visit(leaf) {
                return;
            }
            open += block.node_size();
        }
    }

    fn content_size(&self) -> usize {
        self.size()
    }

    fn text_end(&self) -> usize {
        self.size().saturating_sub(1)
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        if from >= to {
            return out;
        }

        let mut open = 0;
        let mut started = false;
        for block in &self.blocks {
            let close = open + block.node_size();
            if open < to && close > from {
                if started {
                    out.push('\n');
                }
                started = true;

                let content_start = open + 1;
                let s = from.max(content_start) - content_start;
                let e = to.min(content_start + block.char_len()).saturating_sub(content_start);
                out.push_str(char_slice(block.text(), s, e));
            }
            if close >= to {
                break;
            }
            open = close;
        }
        out
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        let size = self.size();
        if pos > size {
            return None;
        }
        if pos == size {
            return Some(ResolvedPos {
                pos,
                depth: 0,
                index: self.blocks.len(),
                text_offset: 0,
                block_id: None,
                kind: None,
            });
        }

        let (idx, open) = self.index.block_at(pos)?;
        let block = &self.blocks[idx];
        if pos == open {
            return Some(ResolvedPos {
                pos,
                depth: 0,
                index: idx,
                text_offset: 0,
                block_id: Some(block.id),
                kind: Some(block.kind),
            });
        }

        Some(ResolvedPos {
            pos,
            depth: 1,
            index: idx,
            text_offset: pos - open - 1,
            block_id: Some(block.id),
            kind: Some(block.kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document() {
        let doc = Document::new();
        assert_eq!(doc.size(), 2);
        assert!(doc.is_empty());
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn test_from_text() {
        let doc = Document::from_text("Hello\nWorld");
        assert_eq!(doc.text(), "Hello\nWorld");
        assert_eq!(doc.block_count(), 2);
        assert_eq!(doc.size(), 14);
        assert_eq!(doc.text_len(), 11);
    }

    #[test]
    fn test_resolve() {
        let doc = Document::from_text("Hello\nWorld");
        let r = doc.resolve(0).unwrap();
        assert_eq!((r.depth, r.index), (0, 0));

        let r = doc.resolve(3).unwrap();
        assert_eq!((r.depth, r.index, r.text_offset), (1, 0, 2));

        // End of "Hello" content, then the close token of block 0
        assert_eq!(doc.resolve(6).unwrap().text_offset, 5);
        let r = doc.resolve(7).unwrap();
        assert_eq!((r.depth, r.index), (0, 1));

        assert_eq!(doc.resolve(14).unwrap().depth, 0);
        assert!(doc.resolve(15).is_none());
    }

    #[test]
    fn test_text_between() {
        let doc = Document::from_text("Hello\nWorld");
        assert_eq!(doc.text_between(1, 6), "Hello");
        assert_eq!(doc.text_between(4, 11), "lo\nWor");
        assert_eq!(doc.text_between(6, 8), "\n");
        assert_eq!(doc.text_between(0, doc.size()), "Hello\nWorld");
        assert_eq!(doc.text_between(5, 5), "");
    }

    #[test]
    fn test_replace_within_block() {
        let mut doc = Document::from_text("The quick brown fox");
        let map = doc.apply(&Step::replace(5, 10, "speedy")).unwrap();
        assert_eq!(doc.text(), "The speedy brown fox");
        assert_eq!(map.delta(), 1);
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_insert_newline_splits_block() {
        let mut doc = Document::from_blocks(vec![(BlockKind::heading(1), "Title text".into())]);
        let map = doc.apply(&Step::insert(6, "\n")).unwrap();
        assert_eq!(doc.text(), "Title\n text");
        assert_eq!(doc.block_count(), 2);
        assert!(doc.blocks()[0].kind.is_heading());
        assert_eq!(doc.blocks()[1].kind, BlockKind::Paragraph);
        assert_eq!(map.new_size, 2);
        assert_eq!(doc.size(), 14);
    }

    #[test]
    fn test_delete_across_blocks_joins() {
        let mut doc = Document::from_text("Hello\nWorld");
        // From after "Hel" to after "Wo"
        doc.apply(&Step::delete(4, 10)).unwrap();
        assert_eq!(doc.text(), "Helrld");
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_invalid_steps() {
        let mut doc = Document::from_text("Hi");
        assert_eq!(
            doc.apply(&Step::delete(3, 1)),
            Err(DocumentError::InvalidRange { from: 3, to: 1, size: 4 })
        );
        assert_eq!(
            doc.apply(&Step::insert(0, "x")),
            Err(DocumentError::NotInTextBlock(0))
        );
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_apply_all() {
        let mut doc = Document::from_text("abc");
        let mapping = doc
            .apply_all(&[Step::insert(1, "xx"), Step::delete(5, 6)])
            .unwrap();
        assert_eq!(doc.text(), "xxab");
        assert_eq!(mapping.maps().len(), 2);
    }

    #[test]
    fn test_leaves() {
        let doc = Document::from_text("ab\n\ncd");
        let mut leaves = Vec::new();
        doc.for_each_leaf(&mut |leaf| {
            leaves.push(format!("{:?}", leaf));
            true
        });
        assert_eq!(leaves.len(), 5);
        assert!(leaves[2].starts_with("EmptyBlock { pos: 5 }"));
    }
}
