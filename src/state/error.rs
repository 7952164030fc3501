use thiserror::Error;

use crate::core::errors::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] RagError),

    #[error("Failed to open vector store: {0}")]
    Store(#[source] RagError),

    #[error("Failed to initialize embedding provider: {0}")]
    Embedding(#[source] RagError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] RagError),
}
