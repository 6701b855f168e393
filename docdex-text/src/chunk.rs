//! Deterministic text chunking.
//!
//! The chunker splits extracted document text into ordered, non-overlapping
//! chunks of bounded length. Concatenating the chunks reconstructs the input
//! exactly, so chunk offsets can be used as stable positional identifiers by
//! the vector index.
//!
//! Splitting is recursive: paragraph breaks are tried first, then line
//! breaks, then spaces, and only when no delimiter fits does a chunk get cut
//! at a character boundary. Delimiters are kept as part of the output so no
//! characters are lost.

use regex::Regex;
use std::ops::Range;

/// Delimiter patterns tried in order, most significant first.
const SPLIT_PATTERNS: &[&str] = &[r"\n\n", r"\n", r" "];

/// Default maximum chunk length in bytes.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 1000;

/// Splits text into bounded, non-overlapping chunks.
///
/// Same input and configuration always produce the same chunk sequence.
#[derive(Debug, Clone)]
pub struct Chunker {
    delimiters: Vec<Regex>,
    max_len: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_LEN)
    }
}

impl Chunker {
    /// Create a chunker with the given maximum chunk length. A `max_len` of
    /// zero is treated as 1 so splitting always terminates.
    pub fn new(max_len: usize) -> Self {
        let delimiters = SPLIT_PATTERNS
            .iter()
            .map(|&pattern| Regex::new(pattern).expect("static pattern compiles"))
            .collect();
        Self {
            delimiters,
            max_len: max_len.max(1),
        }
    }

    /// Maximum length of any produced chunk, in bytes.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Split `text` into chunks. Every chunk is non-empty and at most
    /// `max_len` bytes; the chunks cover `text` in order with no overlap.
    /// Empty input yields an empty vector.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let segments = self.segment(text, 0, 0);

        // Greedily pack adjacent segments into chunks up to max_len.
        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0usize;
        let mut end = 0usize;
        for seg in segments {
            if end - start + (seg.end - seg.start) > self.max_len && start != end {
                chunks.push(text[start..end].to_string());
                start = seg.start;
            } else if start == end {
                start = seg.start;
            }
            end = seg.end;
        }
        if start != end {
            chunks.push(text[start..end].to_string());
        }

        chunks.retain(|c| !c.is_empty());
        chunks
    }

    // Recursively split `text` (located at `offset` within the original
    // input) into byte ranges no longer than max_len. Delimiter matches are
    // emitted as their own segments so the ranges tile the input exactly.
    fn segment(&self, text: &str, delimiter_idx: usize, offset: usize) -> Vec<Range<usize>> {
        let mut segments = Vec::new();
        if text.is_empty() {
            return segments;
        }

        if text.len() <= self.max_len {
            segments.push(offset..offset + text.len());
            return segments;
        }

        // Out of delimiters: hard-split at character boundaries.
        if delimiter_idx >= self.delimiters.len() {
            let mut local = 0usize;
            while local < text.len() {
                let mut cut = (local + self.max_len).min(text.len());
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                if cut == local {
                    // Single oversized character; take it whole rather than loop.
                    cut = (local + self.max_len).min(text.len());
                    while cut < text.len() && !text.is_char_boundary(cut) {
                        cut += 1;
                    }
                }
                segments.push(offset + local..offset + cut);
                local = cut;
            }
            return segments;
        }

        let delimiter = &self.delimiters[delimiter_idx];
        let mut local = 0usize;
        for mat in delimiter.find_iter(text) {
            if mat.start() > local {
                segments.extend(self.segment(
                    &text[local..mat.start()],
                    delimiter_idx + 1,
                    offset + local,
                ));
            }
            segments.push(offset + mat.start()..offset + mat.end());
            local = mat.end();
        }
        if local < text.len() {
            segments.extend(self.segment(&text[local..], delimiter_idx + 1, offset + local));
        }
        segments
    }
}
