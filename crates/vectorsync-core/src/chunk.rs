//! Fixed-window text chunker with overlap.
//!
//! Splits file content into an ordered sequence of [`Chunk`]s of at most
//! `chunk_size` characters, where consecutive chunks share
//! `round(chunk_size * overlap_ratio)` characters.
//!
//! The unit is the Unicode scalar value (`char`), never the byte, so chunk
//! boundaries always fall on valid UTF-8 boundaries and a chunk size means
//! the same thing for ASCII and non-ASCII text.
//!
//! # Algorithm
//!
//! 1. `overlap = round(chunk_size × overlap_ratio)`, clamped to
//!    `chunk_size - 1` so the window always advances.
//! 2. `step = chunk_size - overlap`.
//! 3. Chunk `i` covers characters `[i × step, i × step + chunk_size)`,
//!    truncated at the end of the content.
//! 4. Generation stops after the first chunk that reaches the end.
//!
//! # Example
//!
//! ```rust
//! use vectorsync_core::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::new(5, 0.2).unwrap();
//! let texts: Vec<String> = chunk_text("hello world", &params)
//!     .into_iter()
//!     .map(|c| c.text)
//!     .collect();
//! assert_eq!(texts, vec!["hello", "o wor", "rld"]);
//! ```

use anyhow::{bail, Result};

use crate::models::Chunk;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2500;

/// Default fraction of a chunk shared with its predecessor.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.2;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap_ratio: f64,
}

impl ChunkParams {
    /// Build parameters, rejecting `chunk_size == 0` and ratios outside `[0, 1)`.
    pub fn new(chunk_size: usize, overlap_ratio: f64) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if !overlap_ratio.is_finite() || !(0.0..1.0).contains(&overlap_ratio) {
            bail!(
                "overlap_ratio must be in [0.0, 1.0), got {}",
                overlap_ratio
            );
        }
        Ok(Self {
            chunk_size,
            overlap_ratio,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_ratio(&self) -> f64 {
        self.overlap_ratio
    }

    /// Number of characters shared by consecutive chunks.
    pub fn overlap(&self) -> usize {
        let overlap = (self.chunk_size as f64 * self.overlap_ratio).round() as usize;
        overlap.min(self.chunk_size - 1)
    }

    /// Distance in characters between the starts of consecutive chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap()
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
        }
    }
}

/// Split `content` into overlapping chunks.
///
/// # Guarantees
///
/// - Deterministic for identical input and parameters.
/// - At least one chunk is always returned. Content no longer than
///   `chunk_size` (including empty content) yields exactly one chunk equal to
///   the whole content.
/// - Ordinals are contiguous: `0, 1, 2, …, N-1`.
/// - Every chunk but the last has exactly `chunk_size` characters.
/// - The first chunk followed by every later chunk minus its first
///   [`ChunkParams::overlap`] characters reconstructs `content`.
pub fn chunk_text(content: &str, params: &ChunkParams) -> Vec<Chunk> {
    let byte_offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
    let total_chars = byte_offsets.len();
    let byte_at = |char_idx: usize| -> usize {
        byte_offsets
            .get(char_idx)
            .copied()
            .unwrap_or(content.len())
    };

    let step = params.step();
    let mut chunks = Vec::with_capacity(total_chars / step + 1);
    let mut start = 0;

    loop {
        let end = (start + params.chunk_size).min(total_chars);
        chunks.push(Chunk {
            ordinal: chunks.len(),
            offset: start,
            text: content[byte_at(start)..byte_at(end)].to_string(),
        });
        if end >= total_chars {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &str, size: usize, ratio: f64) -> Vec<String> {
        let params = ChunkParams::new(size, ratio).unwrap();
        chunk_text(content, &params)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    /// Undo the overlap: first chunk whole, then each later chunk minus the
    /// characters it shares with its predecessor.
    fn reassemble(chunks: &[Chunk], params: &ChunkParams) -> String {
        let mut out = String::new();
        for c in chunks {
            if c.ordinal == 0 {
                out.push_str(&c.text);
            } else {
                out.extend(c.text.chars().skip(params.overlap()));
            }
        }
        out
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(texts("Hello, world!", 700, 0.2), vec!["Hello, world!"]);
    }

    #[test]
    fn test_exact_size_single_chunk() {
        assert_eq!(texts("abcde", 5, 0.2), vec!["abcde"]);
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", &ChunkParams::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_hello_world_overlap() {
        assert_eq!(texts("hello world", 5, 0.2), vec!["hello", "o wor", "rld"]);
    }

    #[test]
    fn test_zero_overlap_is_contiguous() {
        assert_eq!(
            texts("abcdefghij", 3, 0.0),
            vec!["abc", "def", "ghi", "j"]
        );
    }

    #[test]
    fn test_final_chunk_may_be_short() {
        let chunks = texts("abcdefg", 4, 0.5);
        assert_eq!(chunks, vec!["abcd", "cdef", "efg"]);
        assert!(chunks.last().unwrap().chars().count() < 4);
    }

    #[test]
    fn test_overlap_is_rounded() {
        // 10 × 0.25 = 2.5 rounds to 3
        let params = ChunkParams::new(10, 0.25).unwrap();
        assert_eq!(params.overlap(), 3);
        assert_eq!(params.step(), 7);
    }

    #[test]
    fn test_overlap_clamped_so_window_advances() {
        let params = ChunkParams::new(1, 0.9).unwrap();
        assert_eq!(params.overlap(), 0);
        assert_eq!(params.step(), 1);
        assert_eq!(texts("abc", 1, 0.9), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ordinals_and_offsets() {
        let params = ChunkParams::new(4, 0.25).unwrap();
        let chunks = chunk_text("0123456789abcdef", &params);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
            assert_eq!(c.offset, i * params.step());
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "┌──┐ héllo 世界 🌍!";
        let chunks = texts(text, 3, 0.34);
        for c in &chunks {
            assert!(c.chars().count() <= 3);
        }
        assert_eq!(chunks[0], "┌──");
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta ".repeat(20);
        let a = texts(&text, 17, 0.3);
        let b = texts(&text, 17, 0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coverage_reconstructs_content() {
        let samples = [
            "",
            "x",
            "hello world",
            "fn main() {\n    println!(\"hi\");\n}\n",
            "Привет мир! 世界 🌍 mixed ascii and unicode text, repeated. ",
        ];
        for sample in samples {
            let content = sample.repeat(7);
            for size in [1, 2, 3, 5, 8, 13, 64] {
                for ratio in [0.0, 0.1, 0.2, 0.5, 0.75, 0.99] {
                    let params = ChunkParams::new(size, ratio).unwrap();
                    let chunks = chunk_text(&content, &params);
                    assert_eq!(
                        reassemble(&chunks, &params),
                        content,
                        "size={} ratio={}",
                        size,
                        ratio
                    );
                }
            }
        }
    }

    #[test]
    fn test_full_chunks_except_last() {
        let params = ChunkParams::new(6, 0.5).unwrap();
        let chunks = chunk_text(&"abcdefghij".repeat(5), &params);
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.text.chars().count(), 6);
        }
    }

    #[test]
    fn test_invalid_params() {
        assert!(ChunkParams::new(0, 0.2).is_err());
        assert!(ChunkParams::new(10, 1.0).is_err());
        assert!(ChunkParams::new(10, -0.1).is_err());
        assert!(ChunkParams::new(10, f64::NAN).is_err());
    }
}
