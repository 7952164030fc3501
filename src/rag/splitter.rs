//! Character splitter for retrieved story text.
//!
//! Splits on a fixed separator and greedily packs the pieces back together
//! into chunks no longer than `chunk_size` characters. A single piece that is
//! already too long is kept whole; callers truncate if they need a hard cap.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::config::defaults::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,
    pub separator: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: "\n\n".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn with_chunk_size(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.config.separator.is_empty() {
            vec![text]
        } else {
            text.split(self.config.separator.as_str()).collect()
        };
        let pieces: Vec<&str> = pieces.into_iter().filter(|p| !p.is_empty()).collect();

        self.merge(&pieces)
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(&self.config.separator);

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_sep = if current.is_empty() { 0 } else { sep_len };

            if total + len + joined_sep > chunk_size && !current.is_empty() {
                if total > chunk_size {
                    tracing::warn!(
                        length = total,
                        chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if let Some(chunk) = self.join(&current) {
                    chunks.push(chunk);
                }

                // Drop leading pieces until what remains fits the overlap
                // window and leaves room for the incoming piece.
                loop {
                    let pending_sep = if current.is_empty() { 0 } else { sep_len };
                    let over_window = total > overlap;
                    let no_room = total > 0 && total + len + pending_sep > chunk_size;
                    if !over_window && !no_room {
                        break;
                    }
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    let sep = if current.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(char_len(front) + sep);
                }
            }

            let sep = if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
            total += len + sep;
        }

        if total > chunk_size {
            tracing::warn!(
                length = total,
                chunk_size,
                "Created a chunk longer than the configured size"
            );
        }
        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }

        chunks
    }

    fn join(&self, pieces: &VecDeque<&str>) -> Option<String> {
        let joined = pieces
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(&self.config.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
