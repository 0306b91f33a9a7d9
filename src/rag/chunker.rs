//! Word-window chunking.
//!
//! Splits raw document text into overlapping, word-bounded segments that
//! become the unit of embedding and retrieval. There is no sentence
//! awareness here: windows are purely word-count based.

use super::error::StoreError;

/// Splits text into overlapping windows of at most `max_words` words.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    max_words: usize,
    overlap: usize,
}

impl ChunkSplitter {
    /// Create a splitter, rejecting `overlap >= max_words` up front.
    pub fn new(max_words: usize, overlap: usize) -> Result<Self, StoreError> {
        if max_words == 0 {
            return Err(StoreError::Configuration(
                "max_words must be greater than zero".to_string(),
            ));
        }
        if overlap >= max_words {
            return Err(StoreError::Configuration(format!(
                "overlap ({}) must be smaller than max_words ({})",
                overlap, max_words
            )));
        }
        Ok(Self { max_words, overlap })
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks.
    ///
    /// Input with `max_words` words or fewer comes back as a single chunk.
    /// Longer input is covered by windows starting every
    /// `max_words - overlap` words; the last window may be shorter.
    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.max_words {
            return vec![words.join(" ")];
        }

        let step = self.max_words - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.max_words).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}
