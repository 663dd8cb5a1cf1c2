//! Flat buffer protocol for the decoration bridge
//!
//! ## u32 Buffer Layout:
//! ```text
//! Header:
//! [0]     MAGIC (0x4D534352 = "MSCR" for validation)
//! [1]     SCHEMA_VERSION (protocol version, currently 1)
//! [2]     version_lo (document version)
//! [3]     version_hi (document version)
//! [4]     decoration_count
//! [5]     text_utf16_len (length of the plain text in UTF-16 code units)
//! [6..]   decoration data...
//!
//! Per-decoration: [id_lo, id_hi, doc_from, doc_to, utf16_start, utf16_end,
//!                  edit_type, kind, color]
//!   utf16_start/utf16_end: offsets for JS `substring` on the plain text
//!   edit_type: priority code (Developmental=5 .. Proof=1, unknown 0)
//!   kind: 0 suggestion, 1 needs review, 2 align error
//!   color: RGBA
//! ```

use crate::render::Decoration;
use crate::text::utf16_prefix;

/// Magic number for format validation: "MSCR" (ManuSCRipt)
pub const MAGIC: u32 = 0x4D534352;

/// Schema version for protocol compatibility checking
pub const SCHEMA_VERSION: u32 = 1;

/// Header size in u32 elements
pub const HEADER_SIZE: usize = 6;

/// Number of u32 values per decoration
pub const U32_PER_DECORATION: usize = 9;

/// Decoration buffer for zero-copy WASM transfer
pub struct DecorationBuffer {
    pub u32_data: Vec<u32>,
}

impl Default for DecorationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationBuffer {
    pub fn new() -> Self {
        Self {
            u32_data: Vec::with_capacity(1024),
        }
    }

    pub fn clear(&mut self) {
        self.u32_data.clear();
    }

    /// Reserve room for `count` decorations, reusing the allocation when it
    /// is already large enough. JS holds a pointer into the buffer between
    /// frames, so growth only happens here.
    pub fn prepare(&mut self, count: usize) {
        let target = HEADER_SIZE + count * U32_PER_DECORATION + 32;
        if self.u32_data.capacity() < target {
            self.u32_data = Vec::with_capacity(target);
        } else {
            self.u32_data.clear();
        }
    }

    pub fn write_header(&mut self, version: u64) {
        self.u32_data.push(MAGIC); // [0] magic number
        self.u32_data.push(SCHEMA_VERSION); // [1] schema version
        self.u32_data.push((version & 0xFFFF_FFFF) as u32); // [2] version_lo
        self.u32_data.push((version >> 32) as u32); // [3] version_hi
        self.u32_data.push(0); // [4] decoration_count (placeholder)
        self.u32_data.push(0); // [5] text_utf16_len (placeholder)
    }

    /// Encode a full frame of decorations against the current plain text
    pub fn write_decorations(&mut self, version: u64, decorations: &[Decoration], text: &str) {
        self.prepare(decorations.len());
        self.write_header(version);

        let prefix = utf16_prefix(text);
        let last = prefix.len() - 1;
        let utf16 = |char_idx: usize| prefix[char_idx.min(last)];

        for decoration in decorations {
            let id = decoration.id.0;
            self.u32_data.extend_from_slice(&[
                (id & 0xFFFF_FFFF) as u32,
                (id >> 32) as u32,
                decoration.from as u32,
                decoration.to as u32,
                utf16(decoration.char_start),
                utf16(decoration.char_end),
                decoration.edit_type.priority() as u32,
                decoration.kind.code(),
                decoration.color,
            ]);
        }

        self.finalize(decorations.len(), prefix[last]);
    }

    /// Synchronize header counts after writing
    pub fn finalize(&mut self, count: usize, text_utf16_len: u32) {
        if self.u32_data.len() < HEADER_SIZE {
            return;
        }
        self.u32_data[4] = count as u32;
        self.u32_data[5] = text_utf16_len;

        debug_assert_eq!(
            self.u32_data.len(),
            HEADER_SIZE + count * U32_PER_DECORATION,
            "decoration buffer length does not match header count"
        );
    }

    pub fn u32_ptr(&self) -> u32 {
        self.u32_data.as_ptr() as u32
    }

    pub fn u32_len(&self) -> u32 {
        self.u32_data.len() as u32
    }

    pub fn decoration_count(&self) -> usize {
        self.u32_data.get(4).copied().unwrap_or(0) as usize
    }
}
