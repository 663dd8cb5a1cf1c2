//! Block indexing for fast position lookups

use super::block::{Block, BlockId};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Index structure for fast block lookups by document position
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    /// Maps a block's opening position to its index in document order
    open_to_block: BTreeMap<usize, usize>,
    /// Maps block ID to (opening position, text length)
    block_bounds: FxHashMap<BlockId, (usize, usize)>,
    /// Total content size
    size: usize,
}

impl BlockIndex {
    /// Build an index over blocks in document order
    pub fn build(blocks: &[Block]) -> Self {
        let mut index = Self::default();
        index.rebuild(blocks);
        index
    }

    /// Recompute all bounds after a structural change
    pub fn rebuild(&mut self, blocks: &[Block]) {
        self.open_to_block.clear();
        self.block_bounds.clear();

        let mut open = 0;
        for (i, block) in blocks.iter().enumerate() {
            self.open_to_block.insert(open, i);
            self.block_bounds.insert(block.id, (open, block.char_len()));
            open += block.node_size();
        }
        self.size = open;
    }

    /// Find the block whose opening position is the largest one `<= pos`
    pub fn block_at(&self, pos: usize) -> Option<(usize, usize)> {
        self.open_to_block
            .range(..=pos)
            .next_back()
            .map(|(&open, &idx)| (idx, open))
    }

    /// Get (opening position, text length) of a block
    pub fn bounds(&self, id: BlockId) -> Option<(usize, usize)> {
        self.block_bounds.get(&id).copied()
    }

    /// Total content size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of indexed blocks
    pub fn len(&self) -> usize {
        self.open_to_block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_to_block.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;

    fn blocks() -> Vec<Block> {
        vec![
            Block::new(BlockId(0), BlockKind::Paragraph, "Hello"),
            Block::new(BlockId(1), BlockKind::Paragraph, ""),
            Block::new(BlockId(2), BlockKind::heading(1), "World"),
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let index = BlockIndex::build(&blocks());

        // Hello occupies 0..7, the empty block 7..9, World 9..16
        assert_eq!(index.size(), 16);
        assert_eq!(index.block_at(0), Some((0, 0)));
        assert_eq!(index.block_at(6), Some((0, 0)));
        assert_eq!(index.block_at(7), Some((1, 7)));
        assert_eq!(index.block_at(8), Some((1, 7)));
        assert_eq!(index.block_at(12), Some((2, 9)));
    }

    #[test]
    fn test_bounds() {
        let index = BlockIndex::build(&blocks());
        assert_eq!(index.bounds(BlockId(2)), Some((9, 5)));
        assert_eq!(index.bounds(BlockId(7)), None);
        assert_eq!(index.len(), 3);
    }
}
