//! `VectorStore`: the retrieval seam between the chat pipeline and storage.
//!
//! The primary implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;

use super::models::{NewQandA, NewStory, QandAPair, RetrievedDocument, StoreStats, StoryId};
use crate::core::errors::RagError;

/// Storage for stories and their Q&A pairs with dot-product retrieval.
///
/// Implementations must:
/// - reject `top_k == 0` with `RagError::Validation`
/// - return results in non-increasing score order
/// - return an empty vector (not an error) when nothing matches
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stories ranked by the similarity of their Q&A question embeddings.
    ///
    /// One row per matching Q&A, so a story with several close questions
    /// can appear more than once.
    async fn search_by_q_and_a(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError>;

    /// Stories ranked by their own embeddings.
    async fn search_by_story(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError>;

    /// Up to `top_k` Q&A pairs belonging to any of `story_ids`.
    async fn search_q_and_a_docs_by_story(
        &self,
        story_ids: &[StoryId],
        top_k: usize,
    ) -> Result<Vec<QandAPair>, RagError>;

    async fn insert_story(&self, story: &str, embedding: &[f32]) -> Result<StoryId, RagError>;

    async fn insert_q_and_a(
        &self,
        story_id: StoryId,
        q_and_a: &NewQandA,
    ) -> Result<i64, RagError>;

    /// Writes stories with their Q&A pairs atomically.
    async fn insert_batch(&self, stories: &[NewStory]) -> Result<Vec<StoryId>, RagError>;

    async fn stats(&self) -> Result<StoreStats, RagError>;

    /// Drops every row and the recorded embedding dimensionality.
    ///
    /// Used when the embedding model changes and all vectors are invalidated.
    async fn clear(&self) -> Result<(), RagError>;
}

pub(crate) fn validate_top_k(top_k: usize) -> Result<(), RagError> {
    if top_k == 0 {
        return Err(RagError::validation("top_k must be at least 1"));
    }
    Ok(())
}
