//! Recursive character splitter with exact overlap.
//!
//! Lengths are counted in Unicode scalar values. A cut is placed after the
//! last separator of the highest-priority kind that fits in the window, and
//! the next chunk starts `overlap` characters before that cut. Nothing is
//! trimmed, so chunks reassemble into the original text.

use securerag_core::{AppError, AppResult};

/// Boundary kinds in order of preference: paragraph, line, sentence, word.
const SEPARATOR_LEVELS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Splits text into chunks of at most `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Vec<Vec<char>>>,
}

impl RecursiveSplitter {
    /// Create a splitter. Requires `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let separators = SEPARATOR_LEVELS
            .iter()
            .map(|level| level.iter().map(|sep| sep.chars().collect()).collect())
            .collect();

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let end = self.find_cut(&chars, start);
            chunks.push(chars[start..end].iter().collect());

            // end > start + overlap, so this always advances.
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the end of the chunk starting at `start`.
    ///
    /// The cut lies in `(start + overlap, start + chunk_size]` and falls
    /// right after a separator when one is available.
    fn find_cut(&self, chars: &[char], start: usize) -> usize {
        let lowest = start + self.chunk_overlap + 1;
        let highest = start + self.chunk_size;

        for level in &self.separators {
            let best = level
                .iter()
                .filter_map(|sep| last_separator_end(chars, start, lowest, highest, sep))
                .max();

            if let Some(end) = best {
                return end;
            }
        }

        highest
    }
}

/// Largest `end` in `[lowest, highest]` such that `chars[..end]` ends with
/// `sep` and the separator lies entirely at or after `start`.
fn last_separator_end(
    chars: &[char],
    start: usize,
    lowest: usize,
    highest: usize,
    sep: &[char],
) -> Option<usize> {
    (lowest..=highest)
        .rev()
        .find(|&end| end >= start + sep.len() && chars[end - sep.len()..end] == *sep)
}
