//! Char-offset helpers over UTF-8 strings
//!
//! All offsets exposed by the engine count `char`s, while Rust strings are
//! indexed by bytes. These helpers keep the conversion in one place.

/// Length of `s` in chars
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `char_idx`-th char, clamped to the string end
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Slice `s` by char offsets, clamping out-of-range bounds
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let from = char_to_byte(s, start);
    let to = char_to_byte(s, end);
    &s[from..to]
}

/// Table translating between char offsets and byte offsets of one string
///
/// Built once per text so that repeated searches stay linear.
#[derive(Debug, Clone)]
pub struct CharTable {
    /// Byte offset of every char, plus the total byte length at the end
    byte_of_char: Vec<usize>,
}

impl CharTable {
    pub fn new(s: &str) -> Self {
        let mut byte_of_char: Vec<usize> = s.char_indices().map(|(b, _)| b).collect();
        byte_of_char.push(s.len());
        Self { byte_of_char }
    }

    /// Number of chars in the indexed text
    pub fn char_len(&self) -> usize {
        self.byte_of_char.len() - 1
    }

    /// Byte offset for a char offset, clamped to the end
    pub fn byte(&self, char_idx: usize) -> usize {
        let last = self.byte_of_char.len() - 1;
        self.byte_of_char[char_idx.min(last)]
    }

    /// Char offset of a byte offset that lies on a char boundary
    pub fn char_at_byte(&self, byte: usize) -> usize {
        match self.byte_of_char.binary_search(&byte) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }
}

/// Every occurrence of `needle` in `haystack` whose start is `>= from_char`,
/// as char ranges. Overlapping occurrences are reported.
pub fn find_all(haystack: &str, needle: &str, from_char: usize) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }

    let table = CharTable::new(haystack);
    let needle_chars = char_len(needle);
    let mut found = Vec::new();
    let mut byte = table.byte(from_char);

    while let Some(rel) = haystack[byte..].find(needle) {
        let start_byte = byte + rel;
        let start = table.char_at_byte(start_byte);
        found.push((start, start + needle_chars));
        // Step one char forward so overlapping matches are seen
        byte = table.byte(start + 1);
        if byte >= haystack.len() {
            break;
        }
    }

    found
}

/// UTF-16 offset of every char boundary: entry `i` counts the code units
/// of the first `i` chars, so the table has `char_len(s) + 1` entries
pub fn utf16_prefix(s: &str) -> Vec<u32> {
    let mut prefix = Vec::with_capacity(s.len() + 1);
    let mut total = 0u32;
    prefix.push(0);
    for c in s.chars() {
        total += c.len_utf16() as u32;
        prefix.push(total);
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_slice_multibyte() {
        let s = "naïve café";
        assert_eq!(char_len(s), 10);
        assert_eq!(char_slice(s, 6, 10), "café");
        assert_eq!(char_slice(s, 8, 50), "fé");
        assert_eq!(char_slice(s, 5, 2), "");
    }

    #[test]
    fn test_find_all() {
        let s = "the cat and the hat";
        assert_eq!(find_all(s, "the", 0), vec![(0, 3), (12, 15)]);
        assert_eq!(find_all(s, "the", 1), vec![(12, 15)]);
        assert!(find_all(s, "dog", 0).is_empty());
        assert!(find_all(s, "", 0).is_empty());
    }

    #[test]
    fn test_find_all_overlapping_and_unicode() {
        assert_eq!(find_all("aaaa", "aa", 0), vec![(0, 2), (1, 3), (2, 4)]);
        assert_eq!(find_all("é é é", "é", 1), vec![(2, 3), (4, 5)]);
    }

    #[test]
    fn test_utf16_prefix() {
        assert_eq!(utf16_prefix("a😀b"), vec![0, 1, 3, 4]);
        assert_eq!(utf16_prefix(""), vec![0]);
    }
}
