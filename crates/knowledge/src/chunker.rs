//! Sentence-aware chunking with word-level overlap.
//!
//! Word count stands in for token count. Sentence boundaries are a
//! best-effort punctuation heuristic, not a grammar-aware splitter.

use crate::config::KnowledgeConfig;
use regex::Regex;
use std::sync::LazyLock;

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("sentence boundary regex is valid"));

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    /// Target chunk size in words
    pub target_size: usize,

    /// Trailing words of a closed chunk that seed the next one
    pub overlap: usize,

    /// Chunks with this many words or fewer are dropped
    pub min_words: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            target_size: 300,
            overlap: 50,
            min_words: 20,
        }
    }
}

impl Chunker {
    pub fn new(target_size: usize, overlap: usize) -> Self {
        Self {
            target_size,
            overlap,
            ..Default::default()
        }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self {
            target_size: config.chunk_size,
            overlap: config.chunk_overlap,
            min_words: config.min_chunk_words,
        }
    }

    /// Split `text` into overlapping chunks, in document order.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut buffer_len = 0usize;

        for unit in split_sentences(text) {
            let words: Vec<&str> = unit.split_whitespace().collect();
            let approx_tokens = words.len().max(1);

            if buffer_len + approx_tokens > self.target_size && !buffer.is_empty() {
                chunks.push(buffer.join(" "));

                let keep_from = buffer.len().saturating_sub(self.overlap);
                buffer.drain(..keep_from);
                buffer_len = buffer.len();
            }

            buffer.extend(words);
            buffer_len += approx_tokens;
        }

        if !buffer.is_empty() {
            chunks.push(buffer.join(" "));
        }

        let produced = chunks.len();
        chunks.retain(|c| c.split_whitespace().count() > self.min_words);

        tracing::trace!(
            "Chunked {} bytes into {} chunks ({} below {} words dropped)",
            text.len(),
            chunks.len(),
            produced - chunks.len(),
            self.min_words
        );

        chunks
    }
}

/// Split text after terminal punctuation followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut units = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END_RE.find_iter(text) {
        // Punctuation is ASCII, so one byte past the match start is a char boundary.
        units.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }

    if start < text.len() {
        units.push(&text[start..]);
    }

    units
}
