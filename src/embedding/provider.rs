use async_trait::async_trait;

use crate::core::errors::RagError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "openai_compat")
    fn name(&self) -> &str;

    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed(&[query.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(RagError::Embedding(format!(
                "{} returned no vector for the query",
                self.name()
            ))),
        }
    }
}
