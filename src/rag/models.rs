//! Rows of the `story` / `qanda` tables and the records retrieval hands back.

use serde::{Deserialize, Serialize};

pub type StoryId = i64;

/// A story ready to be written, with the Q&A pairs that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub story: String,
    pub embedding: Vec<f32>,
    pub q_and_a: Vec<NewQandA>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQandA {
    pub question: String,
    pub answer: String,
    pub question_embedding: Vec<f32>,
}

/// One similarity hit: the story text and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub story_id: StoryId,
    /// Dot-product score (higher = more relevant).
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QandAPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub stories: usize,
    pub q_and_a: usize,
    pub embedding_dimensions: Option<usize>,
}
