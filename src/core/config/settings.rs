//! Typed view of the merged configuration tree.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use super::defaults::*;
use super::paths::AppPaths;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; falls back to `<data_dir>/coqa_rag.db`.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseConfig {
    pub fn resolve_path(&self, paths: &AppPaths) -> PathBuf {
        self.path.clone().unwrap_or_else(|| paths.db_path.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub q_and_a_top_k: usize,
    pub story_top_k: usize,
    pub example_top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_fragment_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            q_and_a_top_k: DEFAULT_Q_AND_A_TOP_K,
            story_top_k: DEFAULT_STORY_TOP_K,
            example_top_k: DEFAULT_EXAMPLE_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_fragment_chars: DEFAULT_MAX_FRAGMENT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_query_chars: usize,
    /// Prior turns forwarded to the model along with the rendered prompt.
    pub history_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl AppConfig {
    pub fn from_value(value: &Value) -> Result<Self, RagError> {
        serde_json::from_value(value.clone()).map_err(|e| RagError::Config(e.to_string()))
    }
}
