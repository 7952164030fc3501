//! Context assembly.
//!
//! Turns retrieved stories into the short fragments quoted in the prompt:
//! 1. Split every retrieved document into chunks
//! 2. Truncate each chunk to `max_fragment_chars`
//! 3. Append the best story-level match verbatim

use serde::{Deserialize, Serialize};

use super::models::RetrievedDocument;
use super::splitter::{truncate_chars, SplitterConfig, TextSplitter};
use crate::core::config::defaults::DEFAULT_MAX_FRAGMENT_CHARS;
use crate::core::config::RetrievalConfig;

/// Configuration for context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub splitter: SplitterConfig,
    /// Hard cap applied to each chunk after splitting
    pub max_fragment_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            max_fragment_chars: DEFAULT_MAX_FRAGMENT_CHARS,
        }
    }
}

impl From<&RetrievalConfig> for ContextConfig {
    fn from(retrieval: &RetrievalConfig) -> Self {
        Self {
            splitter: SplitterConfig {
                chunk_size: retrieval.chunk_size,
                chunk_overlap: retrieval.chunk_overlap,
                ..Default::default()
            },
            max_fragment_chars: retrieval.max_fragment_chars,
        }
    }
}

/// Builds the ordered fragment list for one chat turn.
///
/// Order follows retrieval order; duplicate chunks are kept as-is.
pub struct ContextAssembler {
    splitter: TextSplitter,
    max_fragment_chars: usize,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            splitter: TextSplitter::new(config.splitter),
            max_fragment_chars: config.max_fragment_chars,
        }
    }

    pub fn assemble(
        &self,
        documents: &[RetrievedDocument],
        best_story: &RetrievedDocument,
    ) -> Vec<String> {
        let mut fragments: Vec<String> = documents
            .iter()
            .flat_map(|doc| self.splitter.split(&doc.content))
            .map(|chunk| truncate_chars(&chunk, self.max_fragment_chars).to_string())
            .collect();

        fragments.push(best_story.content.clone());
        fragments
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
