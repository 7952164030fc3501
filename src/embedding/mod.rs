pub mod openai_compat;
pub mod provider;

pub use openai_compat::OpenAiCompatEmbedder;
pub use provider::EmbeddingProvider;
